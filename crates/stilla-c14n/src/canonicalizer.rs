#![forbid(unsafe_code)]

//! Canonicalizer facade: one resolved algorithm plus per-call settings.

use crate::registry::AlgorithmRegistry;
use crate::secure::SecureValidationPolicy;
use crate::{C14nAlgorithm, C14nInput, C14nMode, C14nParams};
use std::io::Write;
use stilla_core::Error;
use stilla_xml::document::parse_document;
use stilla_xml::{NodeSet, ParseOptions};

/// Drives one canonicalization algorithm.
///
/// Output goes to an internal buffer returned by each call, or to the
/// caller's sink after [`Canonicalizer::set_output`].  The sink is written
/// directly, so the first failed write aborts the call; it is flushed after
/// every successful call and never closed.  An instance holds per-call state and
/// is not meant to be shared between threads; create one per worker.
pub struct Canonicalizer<'w> {
    algorithm: Box<dyn C14nAlgorithm>,
    sink: Option<&'w mut dyn Write>,
    secure_validation: bool,
    policy: SecureValidationPolicy,
}

impl<'w> Canonicalizer<'w> {
    /// Resolve `uri` through `registry`.
    ///
    /// Any failure to produce an instance is reported as
    /// [`Error::UnknownAlgorithm`].
    pub fn new(registry: &AlgorithmRegistry, uri: &str) -> Result<Self, Error> {
        let algorithm = registry
            .lookup(uri)
            .map_err(|_| Error::UnknownAlgorithm(uri.to_owned()))?;
        Ok(Self::with_algorithm(algorithm))
    }

    /// A canonicalizer for a built-in mode, bypassing any registry.
    pub fn from_mode(mode: C14nMode) -> Self {
        Self::with_algorithm(mode.algorithm())
    }

    pub fn with_algorithm(algorithm: Box<dyn C14nAlgorithm>) -> Self {
        Self {
            algorithm,
            sink: None,
            secure_validation: false,
            policy: SecureValidationPolicy::default(),
        }
    }

    /// The algorithm URI this canonicalizer runs.
    pub fn uri(&self) -> &str {
        self.algorithm.uri()
    }

    /// Write subsequent output to `sink` instead of returning it.
    pub fn set_output(&mut self, sink: &'w mut dyn Write) {
        self.sink = Some(sink);
    }

    pub fn set_secure_validation(&mut self, enabled: bool) {
        self.secure_validation = enabled;
    }

    pub fn is_secure_validation(&self) -> bool {
        self.secure_validation
    }

    /// Replace the hardened limits and turn secure validation on.
    pub fn set_secure_validation_policy(&mut self, policy: SecureValidationPolicy) {
        self.policy = policy;
        self.secure_validation = true;
    }

    /// Parse `data` and canonicalize the whole document.
    ///
    /// Parse failures surface as [`Error::XmlParse`] (or
    /// [`Error::SecureValidation`] for a DOCTYPE or node-limit rejection in
    /// hardened mode), distinct from canonicalization failures.
    pub fn canonicalize_document(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        let options = if self.secure_validation {
            self.policy.parse_options()
        } else {
            ParseOptions::default()
        };
        let doc = parse_document(text, options)?;
        self.canonicalize_tree(&doc)
    }

    /// Canonicalize an already-parsed document.
    pub fn canonicalize_tree(&mut self, doc: &roxmltree::Document<'_>) -> Result<Vec<u8>, Error> {
        let params = self.params(&[], false);
        self.run(C14nInput::Document(doc), params)
    }

    /// Canonicalize the subtree rooted at `root` as if serialized alone,
    /// with ancestor namespace scope in effect.
    pub fn canonicalize_subtree(
        &mut self,
        root: roxmltree::Node<'_, '_>,
        inclusive_prefixes: &[String],
        propagate_default_namespace: bool,
    ) -> Result<Vec<u8>, Error> {
        let params = self.params(inclusive_prefixes, propagate_default_namespace);
        self.run(C14nInput::Subtree(root), params)
    }

    /// Canonicalize exactly the nodes of `set`, in document order.
    pub fn canonicalize_node_set(
        &mut self,
        doc: &roxmltree::Document<'_>,
        set: &NodeSet,
        inclusive_prefixes: &[String],
    ) -> Result<Vec<u8>, Error> {
        let params = self.params(inclusive_prefixes, false);
        self.run(C14nInput::NodeSet { doc, set }, params)
    }

    fn params(&self, inclusive_prefixes: &[String], propagate_default_namespace: bool) -> C14nParams {
        C14nParams {
            inclusive_prefixes: inclusive_prefixes.to_vec(),
            propagate_default_namespace,
            secure: self.secure_validation.then(|| self.policy.clone()),
        }
    }

    fn run(&mut self, input: C14nInput<'_, '_>, params: C14nParams) -> Result<Vec<u8>, Error> {
        let uri = self.algorithm.uri();
        tracing::debug!(uri, secure = params.secure.is_some(), "canonicalization started");
        match self.sink.as_deref_mut() {
            Some(sink) => {
                self.algorithm.canonicalize(input, &params, &mut *sink)?;
                sink.flush()?;
                tracing::debug!(uri, "canonicalization finished into caller sink");
                Ok(Vec::new())
            }
            None => {
                let mut output = Vec::new();
                self.algorithm.canonicalize(input, &params, &mut output)?;
                tracing::debug!(uri, bytes = output.len(), "canonicalization finished");
                Ok(output)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stilla_core::{algorithm, ErrorKind};

    #[test]
    fn test_unknown_uri_collapses() {
        let registry = AlgorithmRegistry::with_defaults();
        let err = Canonicalizer::new(&registry, "urn:nope").err().unwrap();
        assert!(matches!(err, Error::UnknownAlgorithm(ref u) if u == "urn:nope"));
    }

    #[test]
    fn test_buffered_output() {
        let registry = AlgorithmRegistry::with_defaults();
        let mut c14n = Canonicalizer::new(&registry, algorithm::C14N).unwrap();
        assert_eq!(c14n.uri(), algorithm::C14N);
        let out = c14n.canonicalize_document(b"<a  b='1'/>").unwrap();
        assert_eq!(out, br#"<a b="1"></a>"#);
    }

    #[test]
    fn test_sink_output() {
        let mut sink = Vec::new();
        {
            let mut c14n = Canonicalizer::from_mode(C14nMode::Exclusive);
            c14n.set_output(&mut sink);
            let out = c14n.canonicalize_document(b"<a><b/></a>").unwrap();
            assert!(out.is_empty());
            c14n.canonicalize_document(b"<c/>").unwrap();
        }
        assert_eq!(sink, b"<a><b></b></a><c></c>");
    }

    struct ClosedSink {
        writes: usize,
    }

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_sink_write_not_retried() {
        let mut sink = ClosedSink { writes: 0 };
        {
            let mut c14n = Canonicalizer::from_mode(C14nMode::Inclusive);
            c14n.set_output(&mut sink);
            let err = c14n.canonicalize_document(b"<a><b/><c/></a>").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Io);
        }
        assert_eq!(sink.writes, 1);
    }

    #[test]
    fn test_secure_validation_rejects_dtd() {
        let xml = b"<!DOCTYPE a [<!ENTITY e \"x\">]><a>&e;</a>";
        let mut c14n = Canonicalizer::from_mode(C14nMode::Inclusive);
        assert_eq!(c14n.canonicalize_document(xml).unwrap(), b"<a>x</a>");
        c14n.set_secure_validation(true);
        assert!(c14n.is_secure_validation());
        let err = c14n.canonicalize_document(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecureValidation);
    }

    #[test]
    fn test_parse_error_distinct() {
        let mut c14n = Canonicalizer::from_mode(C14nMode::Inclusive);
        let err = c14n.canonicalize_document(b"<a><b></a>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        let err = c14n.canonicalize_document(&[0x3c, 0xff, 0x3e]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_subtree_and_node_set() {
        let xml = r#"<r xmlns:p="urn:p"><p:e><f/></p:e></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let e = doc.descendants().find(|n| n.has_tag_name("e")).unwrap();
        let mut c14n = Canonicalizer::from_mode(C14nMode::Exclusive);
        assert_eq!(
            c14n.canonicalize_subtree(e, &[], false).unwrap(),
            br#"<p:e xmlns:p="urn:p"><f></f></p:e>"#
        );
        let set = NodeSet::tree(e, false);
        assert_eq!(
            c14n.canonicalize_node_set(&doc, &set, &[]).unwrap(),
            br#"<p:e xmlns:p="urn:p"><f></f></p:e>"#
        );
    }
}
