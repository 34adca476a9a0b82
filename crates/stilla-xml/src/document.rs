#![forbid(unsafe_code)]

//! XML document wrapper over roxmltree with ID attribute registration.

use stilla_core::Error;
use std::collections::HashMap;

/// Parser settings handed to roxmltree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept a DOCTYPE. roxmltree never fetches external subsets and only
    /// expands internal entities, so this is safe outside hardened mode.
    pub allow_dtd: bool,
    /// Upper bound on the number of tree nodes.
    pub nodes_limit: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_dtd: true,
            nodes_limit: u32::MAX,
        }
    }
}

impl ParseOptions {
    fn to_roxmltree(self) -> roxmltree::ParsingOptions {
        roxmltree::ParsingOptions {
            allow_dtd: self.allow_dtd,
            nodes_limit: self.nodes_limit,
            ..roxmltree::ParsingOptions::default()
        }
    }
}

/// Parse `text` into a borrowed tree, mapping parser failures onto [`Error`].
pub fn parse_document(text: &str, options: ParseOptions) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(text, options.to_roxmltree()).map_err(map_parse_error)
}

/// Translate a roxmltree error.
///
/// Unbound prefixes are an input problem rather than a syntax problem, and
/// the two limits that only trip in hardened mode are reported as such.
pub fn map_parse_error(err: roxmltree::Error) -> Error {
    match err {
        roxmltree::Error::UnknownNamespace(prefix, pos) => Error::DanglingNamespace {
            prefix,
            element: format!("element at {pos}"),
        },
        roxmltree::Error::DtdDetected => {
            Error::SecureValidation("document type declarations are not allowed".into())
        }
        roxmltree::Error::NodesLimitReached => {
            Error::SecureValidation("document exceeds the node limit".into())
        }
        other => Error::XmlParse(other.to_string()),
    }
}

/// An owned XML document.  Stores the text and pre-computed metadata.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `roxmltree::Document` borrowing from the text.
pub struct XmlDocument {
    text: String,
    options: ParseOptions,
    /// Additional ID attribute names to register (beyond the default `Id`, `ID`, `id`).
    extra_id_attrs: Vec<String>,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        Self::parse_with(text, ParseOptions::default())
    }

    /// Parse with explicit parser settings.
    pub fn parse_with(text: String, options: ParseOptions) -> Result<Self, Error> {
        parse_document(&text, options)?;
        Ok(Self {
            text,
            options,
            extra_id_attrs: Vec::new(),
        })
    }

    /// Parse and validate XML from bytes.
    pub fn parse_bytes(data: &[u8], options: ParseOptions) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?
            .to_owned();
        Self::parse_with(text, options)
    }

    /// Get the raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Register additional ID attribute names (e.g., `"wsu:Id"` given as `"Id"`).
    pub fn add_id_attr(&mut self, name: &str) {
        self.extra_id_attrs.push(name.to_owned());
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    ///
    /// Call this once at the top of a processing pipeline and pass the
    /// resulting document down through the call chain.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        parse_document(&self.text, self.options)
    }

    /// Build the ID → NodeId mapping for a parsed document.
    pub fn build_id_map(&self, doc: &roxmltree::Document<'_>) -> HashMap<String, roxmltree::NodeId> {
        let default_attrs = ["Id", "ID", "id"];
        let mut map = HashMap::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            let names = default_attrs
                .iter()
                .copied()
                .chain(self.extra_id_attrs.iter().map(String::as_str));
            for attr_name in names {
                if let Some(val) = node.attribute(attr_name) {
                    map.insert(val.to_owned(), node.id());
                }
            }
        }
        map
    }

    /// Find an element by its registered ID value in a parsed document.
    pub fn find_by_id<'a, 'input>(
        doc: &'a roxmltree::Document<'input>,
        id_map: &HashMap<String, roxmltree::NodeId>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        let node_id = id_map.get(id)?;
        doc.get_node(*node_id)
    }
}
