#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML namespace, bound to the `xml` prefix in every document.
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// The reserved prefix of the XML namespace.
pub const XML_PREFIX: &str = "xml";

/// The reserved prefix of namespace declarations.
pub const XMLNS_PREFIX: &str = "xmlns";

/// Token naming the default namespace in an InclusiveNamespaces `PrefixList`.
pub const DEFAULT_PREFIX_TOKEN: &str = "#default";

// ── Attribute names ──────────────────────────────────────────────────

/// Local names of the attributes in the XML namespace.
pub mod attr {
    pub const XML_BASE: &str = "base";
    pub const XML_LANG: &str = "lang";
    pub const XML_SPACE: &str = "space";
}
