#![forbid(unsafe_code)]

/// Errors produced by the stilla XML canonicalization library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown canonicalization algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("algorithm already registered: {0}")]
    AlreadyRegistered(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("undeclared namespace prefix `{prefix}` in {element}")]
    DanglingNamespace { prefix: String, element: String },

    #[error("unsupported node type: {0}")]
    UnsupportedNodeType(String),

    #[error("secure validation violation: {0}")]
    SecureValidation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown or duplicate algorithm identifier.
    Configuration,
    /// Malformed tree, dangling namespace reference, unsupported node kind.
    Input,
    /// A hardened-mode limit was exceeded.
    SecureValidation,
    /// The output sink failed.
    Io,
    /// The parser rejected the byte input.
    Parse,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAlgorithm(_) | Self::AlreadyRegistered(_) => ErrorKind::Configuration,
            Self::XmlStructure(_) | Self::DanglingNamespace { .. } | Self::UnsupportedNodeType(_) => {
                ErrorKind::Input
            }
            Self::SecureValidation(_) => ErrorKind::SecureValidation,
            Self::Io(_) => ErrorKind::Io,
            Self::XmlParse(_) => ErrorKind::Parse,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::UnknownAlgorithm("urn:x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::AlreadyRegistered("urn:x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::DanglingNamespace {
                prefix: "p".into(),
                element: "<p:a>".into()
            }
            .kind(),
            ErrorKind::Input
        );
        assert_eq!(Error::XmlParse("eof".into()).kind(), ErrorKind::Parse);
        assert_eq!(
            Error::SecureValidation("too deep".into()).kind(),
            ErrorKind::SecureValidation
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source().is_some());
    }
}
