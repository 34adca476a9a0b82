#![forbid(unsafe_code)]

//! Hardened-mode limits.
//!
//! When secure validation is on, byte input carrying a DOCTYPE is rejected
//! at parse time and the traversal enforces the bounds below.  Each bound
//! fails the whole call; nothing is truncated.

use stilla_core::Error;
use stilla_xml::ParseOptions;

/// Limits applied when secure validation is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureValidationPolicy {
    /// Attributes plus namespace declarations on a single element.
    pub max_attributes_per_element: usize,
    /// Comments emitted by one canonicalization call.
    pub max_comments: usize,
    /// Element nesting depth, counted from the document element.
    pub max_depth: usize,
    /// Node limit handed to the parser for byte input.
    pub max_nodes: u32,
    /// Reject byte input with a document type declaration, and with it any
    /// external reference a DTD could introduce.
    pub forbid_dtd: bool,
}

impl Default for SecureValidationPolicy {
    fn default() -> Self {
        Self {
            max_attributes_per_element: 256,
            max_comments: 1024,
            max_depth: 512,
            max_nodes: 1_000_000,
            forbid_dtd: true,
        }
    }
}

impl SecureValidationPolicy {
    /// Parser settings for byte input under this policy.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            allow_dtd: !self.forbid_dtd,
            nodes_limit: self.max_nodes,
        }
    }
}

/// Per-call counters checked against an optional policy.
#[derive(Debug, Default)]
pub(crate) struct Guard {
    policy: Option<SecureValidationPolicy>,
    comments: usize,
}

impl Guard {
    pub(crate) fn new(policy: Option<SecureValidationPolicy>) -> Self {
        Self {
            policy,
            comments: 0,
        }
    }

    pub(crate) fn check_attributes(&self, element: &str, count: usize) -> Result<(), Error> {
        match &self.policy {
            Some(p) if count > p.max_attributes_per_element => Err(violation(format!(
                "<{element}> carries {count} attributes, limit is {}",
                p.max_attributes_per_element
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), Error> {
        match &self.policy {
            Some(p) if depth > p.max_depth => Err(violation(format!(
                "element nesting exceeds {} levels",
                p.max_depth
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn count_comment(&mut self) -> Result<(), Error> {
        self.comments += 1;
        match &self.policy {
            Some(p) if self.comments > p.max_comments => Err(violation(format!(
                "more than {} comments",
                p.max_comments
            ))),
            _ => Ok(()),
        }
    }
}

fn violation(message: String) -> Error {
    tracing::warn!(%message, "secure validation violation");
    Error::SecureValidation(message)
}
