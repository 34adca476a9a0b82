#![forbid(unsafe_code)]

//! Canonicalization algorithm URIs.
//!
//! Each constant is the byte-exact identifier that appears in the
//! `Algorithm` attribute of a `CanonicalizationMethod` or `Transform`.

// ── Canonical XML 1.0 ────────────────────────────────────────────────

pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const C14N_WITH_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";

// ── Canonical XML 1.1 ────────────────────────────────────────────────

pub const C14N11: &str = "http://www.w3.org/2006/12/xml-c14n11";
pub const C14N11_WITH_COMMENTS: &str = "http://www.w3.org/2006/12/xml-c14n11#WithComments";

// ── Exclusive Canonical XML 1.0 ──────────────────────────────────────

pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

// ── Non-standard ─────────────────────────────────────────────────────

/// Serializes the physical representation of the tree, used by XML
/// Encryption when the original markup must survive a round trip.
pub const C14N_PHYSICAL: &str = "http://santuario.apache.org/c14n/physical";

/// Suffix shared by every with-comments identifier.
pub const WITH_COMMENTS_SUFFIX: &str = "WithComments";
