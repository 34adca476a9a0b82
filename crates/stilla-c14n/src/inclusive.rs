#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! Every in-scope namespace binding is rendered on the first output element
//! that sees it, and again wherever it changes.  An element whose parent is
//! omitted inherits all `xml:*` attributes of its omitted ancestors.

use crate::context::{self, NamespaceMode, Variant, XmlAttrInheritance};
use crate::{C14nAlgorithm, C14nInput, C14nParams};
use std::io::Write;
use stilla_core::{algorithm, Error};

/// Canonical XML 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct InclusiveC14n {
    with_comments: bool,
}

impl InclusiveC14n {
    pub fn new(with_comments: bool) -> Self {
        Self { with_comments }
    }
}

impl C14nAlgorithm for InclusiveC14n {
    fn uri(&self) -> &str {
        if self.with_comments {
            algorithm::C14N_WITH_COMMENTS
        } else {
            algorithm::C14N
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
            namespaces: NamespaceMode::Inclusive,
            xml_attrs: XmlAttrInheritance::All,
        };
        context::canonicalize(variant, input, params, out)
    }
}
