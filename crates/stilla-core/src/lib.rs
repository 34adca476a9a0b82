#![forbid(unsafe_code)]

//! Shared foundations for the stilla XML canonicalization library:
//! algorithm identifiers, namespace constants and the error type.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, ErrorKind, Result};
