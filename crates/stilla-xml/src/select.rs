#![forbid(unsafe_code)]

//! Same-document reference selection.
//!
//! Supports the reference forms that name either the whole document or a
//! single subtree:
//! - `""` and `#xpointer(/)`: the whole document
//! - `#id` and `#xpointer(id('id'))`: the subtree rooted at the element
//!   carrying that registered ID

use roxmltree::{Document, Node, NodeId};
use std::collections::HashMap;
use stilla_core::Error;

/// What a reference resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a, 'input> {
    Document,
    Subtree(Node<'a, 'input>),
}

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

/// Resolve `reference` against a parsed document and its ID map.
pub fn select<'a, 'input>(
    doc: &'a Document<'input>,
    id_map: &HashMap<String, NodeId>,
    reference: &str,
) -> Result<Selection<'a, 'input>, Error> {
    if reference.is_empty() {
        return Ok(Selection::Document);
    }
    let fragment = parse_same_document_ref(reference)
        .ok_or_else(|| Error::XmlStructure(format!("not a same-document reference: {reference}")))?;
    if fragment == "xpointer(/)" {
        return Ok(Selection::Document);
    }
    let id = parse_xpointer_id(fragment).unwrap_or(fragment);
    id_map
        .get(id)
        .and_then(|nid| doc.get_node(*nid))
        .map(Selection::Subtree)
        .ok_or_else(|| Error::XmlStructure(format!("ID not found: {id}")))
}
