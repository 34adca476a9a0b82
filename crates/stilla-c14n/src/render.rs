#![forbid(unsafe_code)]

//! Start-tag items and their canonical ordering.

use crate::escape;
use std::cmp::Ordering;
use std::io::{self, Write};

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI ("" undeclares the default namespace).
    pub uri: String,
}

impl NsDecl {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    /// Write ` xmlns="…"` or ` xmlns:p="…"`.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.prefix.is_empty() {
            write!(out, " xmlns=\"{}\"", escape::escape_attr(&self.uri))
        } else {
            write!(out, " xmlns:{}=\"{}\"", self.prefix, escape::escape_attr(&self.uri))
        }
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        // The empty prefix is already the least string; code-point order
        // of UTF-8 bytes does the rest.
        self.prefix
            .as_bytes()
            .cmp(other.prefix.as_bytes())
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// The qualified name (prefix:local or just local).
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(
            out,
            " {}=\"{}\"",
            self.qualified_name,
            escape::escape_attr(&self.value)
        )
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        // Namespace URI is the primary key and the empty URI sorts first,
        // so unqualified attributes precede qualified ones.
        self.ns_uri
            .as_bytes()
            .cmp(other.ns_uri.as_bytes())
            .then_with(|| self.local_name.as_bytes().cmp(other.local_name.as_bytes()))
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
