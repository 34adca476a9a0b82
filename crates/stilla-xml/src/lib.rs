#![forbid(unsafe_code)]

//! XML document abstraction for the stilla canonicalization library.
//!
//! Provides an owned document wrapper over `roxmltree`, a lexical view of
//! element start tags (prefixes and declaration order, which the tree does
//! not keep), and the `NodeSet` type consumed by document-subset
//! canonicalization.

pub mod document;
pub mod nodeset;
pub mod select;
pub mod syntax;

pub use document::{ParseOptions, XmlDocument};
pub use nodeset::NodeSet;
pub use select::Selection;
pub use syntax::{ElementNames, StartTag};
