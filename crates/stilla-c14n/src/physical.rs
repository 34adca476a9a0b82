#![forbid(unsafe_code)]

//! Physical serialization.
//!
//! Algorithm URI: `http://santuario.apache.org/c14n/physical`
//!
//! Not a W3C canonicalization.  The tree is written back as it was parsed:
//! namespace declarations and attributes keep their source order and
//! spelling, comments are always kept, and nothing is added at the apex or
//! between document-level nodes.
//! Only character escaping is normalized, so the output is still well-formed.

use crate::context::{is_top_level, write_comment, write_pi};
use crate::escape;
use crate::render::NsDecl;
use crate::secure::Guard;
use crate::{C14nAlgorithm, C14nInput, C14nParams};
use roxmltree::{Node, NodeType};
use std::io::Write;
use stilla_core::{algorithm, Error};
use stilla_xml::syntax::qualify;
use stilla_xml::{ElementNames, StartTag};

/// Source-order passthrough serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalC14n;

impl PhysicalC14n {
    pub fn new() -> Self {
        Self
    }
}

enum Step<'a, 'input> {
    Enter(Node<'a, 'input>),
    Leave(String),
}

impl C14nAlgorithm for PhysicalC14n {
    fn uri(&self) -> &str {
        algorithm::C14N_PHYSICAL
    }

    fn with_comments(&self) -> bool {
        true
    }

    fn canonicalize(
        &self,
        input: C14nInput<'_, '_>,
        params: &C14nParams,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        let start = match input {
            C14nInput::Document(doc) => doc.root(),
            C14nInput::Subtree(node) => node,
            C14nInput::NodeSet { .. } => {
                return Err(Error::UnsupportedNodeType(
                    "physical serialization cannot re-emit a node-set".into(),
                ));
            }
        };
        if !params.inclusive_prefixes.is_empty() {
            return Err(Error::UnsupportedNodeType(
                "physical serialization takes no inclusive prefix list".into(),
            ));
        }

        let mut guard = Guard::new(params.secure.clone());
        let mut depth = start.ancestors().skip(1).filter(|n| n.is_element()).count();
        let mut stack = vec![Step::Enter(start)];

        while let Some(step) = stack.pop() {
            let node = match step {
                Step::Enter(node) => node,
                Step::Leave(qname) => {
                    write!(out, "</{qname}>")?;
                    depth -= 1;
                    continue;
                }
            };
            match node.node_type() {
                NodeType::Root => push_children(&mut stack, node),
                NodeType::Element => {
                    let names = ElementNames::of(node);
                    let qname = names.qualified_name();
                    guard.check_attributes(
                        &qname,
                        node.attributes().count() + names.declarations.len(),
                    )?;
                    depth += 1;
                    guard.check_depth(depth)?;

                    write!(out, "<{qname}")?;
                    write_attributes(out, node, &names)?;
                    out.write_all(b">")?;
                    stack.push(Step::Leave(qname));
                    push_children(&mut stack, node);
                }
                NodeType::Text => {
                    if !is_top_level(node) {
                        let text = node.text().unwrap_or("");
                        out.write_all(escape::escape_text(text).as_bytes())?;
                    }
                }
                NodeType::Comment => {
                    guard.count_comment()?;
                    write_comment(out, node)?;
                }
                NodeType::PI => write_pi(out, node)?,
            }
        }
        Ok(())
    }
}

/// Declarations and attributes interleaved as in the start tag.
///
/// Values come from the tree, so entity references are expanded and
/// escaping is normalized.  When the tag cannot be lexed, declarations are
/// written before attributes.
fn write_attributes(
    out: &mut dyn Write,
    node: Node<'_, '_>,
    names: &ElementNames,
) -> Result<(), Error> {
    if let Some(tag) = StartTag::of(node) {
        if tag.plain_attributes().count() == node.attributes().count() {
            let mut attrs = node.attributes();
            for raw in &tag.attributes {
                match raw.declared_prefix() {
                    Some(prefix) => {
                        let uri = node
                            .lookup_namespace_uri((!prefix.is_empty()).then_some(prefix))
                            .unwrap_or("");
                        NsDecl::new(prefix, uri).write_to(out)?;
                    }
                    None => {
                        let value = attrs.next().map(|a| a.value()).unwrap_or("");
                        write!(out, " {}=\"{}\"", raw.qname, escape::escape_attr(value))?;
                    }
                }
            }
            return Ok(());
        }
    }
    for (prefix, uri) in &names.declarations {
        NsDecl::new(prefix, uri).write_to(out)?;
    }
    for (attr, prefix) in node.attributes().zip(&names.attribute_prefixes) {
        write!(
            out,
            " {}=\"{}\"",
            qualify(prefix, attr.name()),
            escape::escape_attr(attr.value())
        )?;
    }
    Ok(())
}

fn push_children<'a, 'input>(stack: &mut Vec<Step<'a, 'input>>, node: Node<'a, 'input>) {
    let children: Vec<Node<'a, 'input>> = node.children().collect();
    stack.extend(children.into_iter().rev().map(Step::Enter));
}
