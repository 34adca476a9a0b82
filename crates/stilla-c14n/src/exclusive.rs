#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! The key difference from inclusive C14N: only "visibly utilized" namespace
//! declarations are output.  A namespace is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList.
//!
//! An unprefixed element visibly utilizes the default namespace, so when
//! none is in scope but an output ancestor rendered one, `xmlns=""` is
//! emitted.  No `xml:*` attributes are inherited.

use crate::context::{self, NamespaceMode, Variant, XmlAttrInheritance};
use crate::{C14nAlgorithm, C14nInput, C14nParams};
use std::io::Write;
use stilla_core::{algorithm, Error};

/// Exclusive Canonical XML 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveC14n {
    with_comments: bool,
}

impl ExclusiveC14n {
    pub fn new(with_comments: bool) -> Self {
        Self { with_comments }
    }
}

impl C14nAlgorithm for ExclusiveC14n {
    fn uri(&self) -> &str {
        if self.with_comments {
            algorithm::EXC_C14N_WITH_COMMENTS
        } else {
            algorithm::EXC_C14N
        }
    }

    fn with_comments(&self) -> bool {
        self.with_comments
    }

    fn canonicalize(
        &self,
        input: C14nInput<'_, '_>,
        params: &C14nParams,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        let variant = Variant {
            with_comments: self.with_comments,
            namespaces: NamespaceMode::Exclusive,
            xml_attrs: XmlAttrInheritance::None,
        };
        context::canonicalize(variant, input, params, out)
    }
}
