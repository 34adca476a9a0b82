//! Behavioral properties that hold across every canonicalization variant.

use proptest::prelude::*;
use std::io::{self, Write};
use stilla_c14n::{
    AlgorithmRegistry, C14nMode, Canonicalizer, ExclusiveC14n, InclusiveC14n,
    SecureValidationPolicy,
};
use std::collections::HashMap;
use stilla_core::{Error, ErrorKind};
use stilla_xml::NodeSet;

const SAMPLE: &str = r#"<?pi x?><!--lead--><doc xmlns="urn:d" xmlns:p="urn:p" xml:lang="en">
  <p:item b="2" a="1" p:c="3"><!--inner-->text &amp; more</p:item>
  <other xmlns="" q="&quot;quoted&quot;"/>
</doc>"#;

fn run(mode: C14nMode, xml: &str) -> Vec<u8> {
    Canonicalizer::from_mode(mode)
        .canonicalize_document(xml.as_bytes())
        .unwrap()
}

fn subtree(mode: C14nMode, xml: &str, tag: &str) -> String {
    let doc = roxmltree::Document::parse(xml).unwrap();
    let node = doc.descendants().find(|n| n.has_tag_name(tag)).unwrap();
    let out = Canonicalizer::from_mode(mode)
        .canonicalize_subtree(node, &[], false)
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn deterministic_across_calls() {
    for mode in C14nMode::ALL {
        assert_eq!(run(mode, SAMPLE), run(mode, SAMPLE), "{mode:?}");
    }
}

#[test]
fn canonical_form_is_a_fixed_point() {
    for mode in C14nMode::ALL {
        let once = run(mode, SAMPLE);
        let twice = run(mode, std::str::from_utf8(&once).unwrap());
        assert_eq!(once, twice, "{mode:?}");
    }
}

#[test]
fn comment_variants_keep_element_order() {
    let xml = "<r><a/><!--c--><b/></r>";
    assert_eq!(run(C14nMode::Inclusive, xml), b"<r><a></a><b></b></r>");
    assert_eq!(
        run(C14nMode::InclusiveWithComments, xml),
        b"<r><a></a><!--c--><b></b></r>"
    );
    assert_eq!(run(C14nMode::Exclusive, xml), b"<r><a></a><b></b></r>");
    assert_eq!(
        run(C14nMode::ExclusiveWithComments, xml),
        b"<r><a></a><!--c--><b></b></r>"
    );
}

#[test]
fn unused_default_namespace_scoping() {
    let xml = r#"<a xmlns="urn:x" xmlns:p="urn:p"><p:b/></a>"#;
    assert_eq!(
        subtree(C14nMode::Exclusive, xml, "b"),
        r#"<p:b xmlns:p="urn:p"></p:b>"#
    );
    assert_eq!(
        subtree(C14nMode::Inclusive, xml, "b"),
        r#"<p:b xmlns="urn:x" xmlns:p="urn:p"></p:b>"#
    );
}

#[test]
fn unprefixed_subtree_keeps_its_default_namespace() {
    // An unprefixed element visibly uses the default namespace, so even
    // exclusive mode renders it at the apex.
    let xml = r#"<a xmlns="urn:x"><b/></a>"#;
    for mode in [C14nMode::Exclusive, C14nMode::Inclusive, C14nMode::Inclusive11] {
        assert_eq!(subtree(mode, xml, "b"), r#"<b xmlns="urn:x"></b>"#);
    }
}

#[test]
fn renaming_an_unused_prefix() {
    let before = r#"<r xmlns:x="urn:other"><p:e xmlns:p="urn:p"/></r>"#;
    let after = r#"<r xmlns:y="urn:other"><p:e xmlns:p="urn:p"/></r>"#;
    assert_eq!(
        subtree(C14nMode::Exclusive, before, "e"),
        subtree(C14nMode::Exclusive, after, "e")
    );
    assert_ne!(
        subtree(C14nMode::Inclusive, before, "e"),
        subtree(C14nMode::Inclusive, after, "e")
    );
}

#[test]
fn duplicate_registration_keeps_first() {
    let registry = AlgorithmRegistry::new();
    let uri = "urn:example:c14n";
    registry
        .register_fn(uri, || Box::new(InclusiveC14n::new(false)))
        .unwrap();
    let err = registry
        .register_fn(uri, || Box::new(ExclusiveC14n::new(false)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    // Inclusive rendering is observable: the unused declaration survives.
    let mut c14n = Canonicalizer::new(&registry, uri).unwrap();
    let out = c14n
        .canonicalize_document(br#"<a xmlns:u="urn:u"/>"#)
        .unwrap();
    assert_eq!(out, br#"<a xmlns:u="urn:u"></a>"#);
}

#[test]
fn unknown_identifier_is_configuration_error() {
    let registry = AlgorithmRegistry::with_defaults();
    let err = Canonicalizer::new(&registry, "urn:unregistered").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn secure_validation_limits() {
    let policy = SecureValidationPolicy {
        max_attributes_per_element: 2,
        max_comments: 1,
        max_depth: 3,
        ..SecureValidationPolicy::default()
    };
    let check = |mode: C14nMode, xml: &str| {
        let mut c14n = Canonicalizer::from_mode(mode);
        c14n.set_secure_validation_policy(policy.clone());
        c14n.canonicalize_document(xml.as_bytes())
    };

    assert!(check(C14nMode::Inclusive, r#"<a x="1" y="2"/>"#).is_ok());
    let err = check(C14nMode::Inclusive, r#"<a x="1" y="2" z="3"/>"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureValidation);

    assert!(check(C14nMode::InclusiveWithComments, "<a><!--1--></a>").is_ok());
    let err = check(C14nMode::InclusiveWithComments, "<a><!--1--><!--2--></a>").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureValidation);
    // Comments dropped by the variant do not count.
    assert!(check(C14nMode::Inclusive, "<a><!--1--><!--2--></a>").is_ok());

    assert!(check(C14nMode::Exclusive, "<a><b><c/></b></a>").is_ok());
    let err = check(C14nMode::Exclusive, "<a><b><c><d/></c></b></a>").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureValidation);

    let err = check(C14nMode::Physical, r#"<a x="1" y="2" z="3"/>"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureValidation);
}

#[test]
fn node_limit_applies_to_byte_input() {
    let mut c14n = Canonicalizer::from_mode(C14nMode::Inclusive);
    c14n.set_secure_validation_policy(SecureValidationPolicy {
        max_nodes: 3,
        ..SecureValidationPolicy::default()
    });
    let err = c14n
        .canonicalize_document(b"<a><b/><c/><d/><e/></a>")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureValidation);
}

struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

#[test]
fn sink_failure_is_io_error() {
    let mut sink = BrokenSink;
    let mut c14n = Canonicalizer::from_mode(C14nMode::Inclusive);
    c14n.set_output(&mut sink);
    let err = c14n.canonicalize_document(b"<a/>").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn namespace_visibility_filter() {
    let xml = r#"<a xmlns:p="urn:p" xmlns:q="urn:q"><b><c/></b></a>"#;
    let doc = roxmltree::Document::parse(xml).unwrap();
    let find = |tag: &str| doc.descendants().find(|n| n.has_tag_name(tag)).unwrap();
    let (a, b, c) = (find("a"), find("b"), find("c"));

    let mut set = NodeSet::from_nodes([a, c]);
    set.set_ns_visible(HashMap::from([
        ((a.id(), "p".to_owned()), true),
        ((a.id(), "q".to_owned()), false),
        ((b.id(), "q".to_owned()), true),
        ((c.id(), "p".to_owned()), true),
        ((c.id(), "q".to_owned()), true),
    ]));

    let out = Canonicalizer::from_mode(C14nMode::Inclusive)
        .canonicalize_node_set(&doc, &set, &[])
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        r#"<a xmlns:p="urn:p"> xmlns:q="urn:q"<c xmlns:q="urn:q"></c></a>"#
    );
}

#[test]
fn attribute_axis_excluded() {
    let xml = r#"<a x="1"><p:b xmlns:p="urn:p" p:y="2"/></a>"#;
    let doc = roxmltree::Document::parse(xml).unwrap();
    let mut set = NodeSet::all(&doc);
    set.set_exclude_attrs(true);
    let out = Canonicalizer::from_mode(C14nMode::Exclusive)
        .canonicalize_node_set(&doc, &set, &[])
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        r#"<a><p:b xmlns:p="urn:p"></p:b></a>"#
    );
}

fn element_with(attrs: &[(String, String)]) -> String {
    let mut xml = String::from(r#"<e xmlns:p="urn:p" xmlns:q="urn:q""#);
    for (name, value) in attrs {
        xml.push_str(&format!(r#" {name}="{value}""#));
    }
    xml.push_str("/>");
    xml
}

fn arb_attributes() -> impl Strategy<Value = Vec<(String, String)>> {
    let names = prop::sample::subsequence(
        vec!["a", "b", "zz", "p:a", "p:b", "q:a", "q:zz", "xml:lang"],
        1..8,
    );
    names
        .prop_flat_map(|names| {
            let n = names.len();
            (Just(names), prop::collection::vec("[a-z0-9 ]{0,6}", n))
        })
        .prop_map(|(names, values)| {
            names
                .into_iter()
                .map(str::to_owned)
                .zip(values)
                .collect()
        })
}

proptest! {
    #[test]
    fn attribute_order_invariance(
        (attrs, shuffled) in arb_attributes().prop_flat_map(|attrs| {
            let shuffled = Just(attrs.clone()).prop_shuffle();
            (Just(attrs), shuffled)
        })
    ) {
        for mode in C14nMode::ALL.into_iter().filter(|m| *m != C14nMode::Physical) {
            prop_assert_eq!(
                run(mode, &element_with(&attrs)),
                run(mode, &element_with(&shuffled))
            );
        }
    }
}
