#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for the stilla library.
//!
//! Implements the six W3C canonicalization variants plus a physical
//! passthrough serializer:
//! - Canonical XML 1.0 (with and without comments)
//! - Canonical XML 1.1 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//! - Physical serialization (source order, comments kept)
//!
//! Algorithms are resolved by URI through an [`AlgorithmRegistry`] and
//! driven through a [`Canonicalizer`].

pub mod canonicalizer;
mod context;
pub mod escape;
pub mod exclusive;
pub mod inclusive;
pub mod inclusive11;
pub mod namespace;
pub mod physical;
pub mod registry;
pub mod render;
pub mod secure;

pub use canonicalizer::Canonicalizer;
pub use exclusive::ExclusiveC14n;
pub use inclusive::InclusiveC14n;
pub use inclusive11::Inclusive11C14n;
pub use physical::PhysicalC14n;
pub use registry::{AlgorithmFactory, AlgorithmRegistry};
pub use secure::SecureValidationPolicy;

use std::io::Write;
use stilla_core::{algorithm, Error};
use stilla_xml::NodeSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Canonical XML 1.1
    Inclusive11,
    /// Canonical XML 1.1 with comments
    Inclusive11WithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
    /// Physical serialization
    Physical,
}

impl C14nMode {
    /// Every built-in mode, in registration order.
    pub const ALL: [C14nMode; 7] = [
        Self::Inclusive,
        Self::InclusiveWithComments,
        Self::Inclusive11,
        Self::Inclusive11WithComments,
        Self::Exclusive,
        Self::ExclusiveWithComments,
        Self::Physical,
    ];

    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Inclusive11 => algorithm::C14N11,
            Self::Inclusive11WithComments => algorithm::C14N11_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
            Self::Physical => algorithm::C14N_PHYSICAL,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.uri() == uri)
    }

    /// Short command-line name.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Inclusive => "c14n",
            Self::InclusiveWithComments => "c14n-comments",
            Self::Inclusive11 => "c14n11",
            Self::Inclusive11WithComments => "c14n11-comments",
            Self::Exclusive => "exc-c14n",
            Self::ExclusiveWithComments => "exc-c14n-comments",
            Self::Physical => "physical",
        }
    }

    /// Parse a short name or a full algorithm URI.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.short_name() == name)
            .or_else(|| Self::from_uri(name))
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments
                | Self::Inclusive11WithComments
                | Self::ExclusiveWithComments
                | Self::Physical
        )
    }

    /// A fresh algorithm instance for this mode.
    pub fn algorithm(&self) -> Box<dyn C14nAlgorithm> {
        match self {
            Self::Inclusive | Self::InclusiveWithComments => {
                Box::new(InclusiveC14n::new(self.with_comments()))
            }
            Self::Inclusive11 | Self::Inclusive11WithComments => {
                Box::new(Inclusive11C14n::new(self.with_comments()))
            }
            Self::Exclusive | Self::ExclusiveWithComments => {
                Box::new(ExclusiveC14n::new(self.with_comments()))
            }
            Self::Physical => Box::new(PhysicalC14n::new()),
        }
    }
}

/// What to canonicalize.
#[derive(Clone, Copy)]
pub enum C14nInput<'a, 'input> {
    /// The whole document.
    Document(&'a roxmltree::Document<'input>),
    /// The subtree rooted at a node, with ancestor context in effect.
    Subtree(roxmltree::Node<'a, 'input>),
    /// Exactly the member nodes of a document subset.
    NodeSet {
        doc: &'a roxmltree::Document<'input>,
        set: &'a NodeSet,
    },
}

impl<'a, 'input> C14nInput<'a, 'input> {
    /// The whole document, or the subset when a node-set is given.
    pub fn from_parts(doc: &'a roxmltree::Document<'input>, node_set: Option<&'a NodeSet>) -> Self {
        match node_set {
            Some(set) => Self::NodeSet { doc, set },
            None => Self::Document(doc),
        }
    }
}

/// Per-call canonicalization parameters.
#[derive(Debug, Clone, Default)]
pub struct C14nParams {
    /// InclusiveNamespaces PrefixList (exclusive mode only); `#default`
    /// names the default namespace.
    pub inclusive_prefixes: Vec<String>,
    /// Render the in-scope default namespace at a subtree apex (exclusive
    /// mode only).
    pub propagate_default_namespace: bool,
    /// Hardened limits, when secure validation is on.
    pub secure: Option<SecureValidationPolicy>,
}

/// A canonicalization algorithm.
///
/// Instances carry no per-call state and may be shared across threads;
/// everything mutable lives in the call.
pub trait C14nAlgorithm: Send + Sync {
    /// The algorithm URI this instance implements.
    fn uri(&self) -> &str;

    /// Whether comment nodes are retained.
    fn with_comments(&self) -> bool;

    /// Write the canonical form of `input` to `out`.
    ///
    /// On failure the bytes already written are not well-formed and must be
    /// discarded.
    fn canonicalize(
        &self,
        input: C14nInput<'_, '_>,
        params: &C14nParams,
        out: &mut dyn Write,
    ) -> Result<(), Error>;
}

/// Split an InclusiveNamespaces `PrefixList` attribute value.
pub fn parse_prefix_list(list: &str) -> Vec<String> {
    list.split_ascii_whitespace().map(str::to_owned).collect()
}

/// Canonicalize an XML document.
///
/// - `xml`: the raw XML text
/// - `mode`: which C14N variant to use
/// - `node_set`: optional node set (for document-subset canonicalization)
/// - `inclusive_prefixes`: for exclusive C14N, the InclusiveNamespaces PrefixList
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = stilla_xml::document::parse_document(xml, stilla_xml::ParseOptions::default())?;
    canonicalize_doc(&doc, mode, node_set, inclusive_prefixes)
}

/// Convenience: canonicalize with a pre-parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let params = C14nParams {
        inclusive_prefixes: inclusive_prefixes.to_vec(),
        ..C14nParams::default()
    };
    let mut output = Vec::new();
    mode.algorithm()
        .canonicalize(C14nInput::from_parts(doc, node_set), &params, &mut output)?;
    Ok(output)
}
