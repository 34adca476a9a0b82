#![forbid(unsafe_code)]

//! Document-order traversal shared by the inclusive and exclusive variants.
//!
//! The walk is iterative: an explicit stack of enter/leave steps mirrors the
//! element nesting, and the namespace tracker pushes one frame per element
//! on the same rhythm.  Which nodes are output depends on the scope:
//!
//! - a whole document: every node (comments per variant)
//! - a subtree: every node under the apex, with ancestor declarations and
//!   `xml:*` attributes still in effect
//! - a node-set: exactly the member nodes, in document order

use crate::escape;
use crate::inclusive11;
use crate::namespace::NamespaceTracker;
use crate::render::{Attr, NsDecl};
use crate::secure::Guard;
use crate::{C14nInput, C14nParams};
use roxmltree::{Node, NodeId, NodeType};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::iter::successors;
use stilla_core::{ns, Error};
use stilla_xml::syntax::{qualify, ElementNames};
use stilla_xml::NodeSet;

/// How the namespace axis is reduced at each output element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamespaceMode {
    /// Render every in-scope binding not already rendered by an output ancestor.
    Inclusive,
    /// Render only visibly utilized bindings (plus the InclusiveNamespaces list).
    Exclusive,
}

/// Which `xml:*` attributes flow into an element whose parent is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XmlAttrInheritance {
    None,
    /// Canonical XML 1.0: every `xml:*` attribute.
    All,
    /// Canonical XML 1.1: `xml:lang` and `xml:space`, plus `xml:base` fix-up.
    Revision11,
}

/// The policy knobs that distinguish one variant from another.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Variant {
    pub with_comments: bool,
    pub namespaces: NamespaceMode,
    pub xml_attrs: XmlAttrInheritance,
}

#[derive(Clone, Copy)]
enum Scope<'s> {
    Document,
    Subtree(NodeId),
    NodeSet(&'s NodeSet),
}

enum Step<'a, 'input> {
    /// A node to visit, and whether its parent element was output.
    Enter(Node<'a, 'input>, bool),
    /// Close an element; carries the QName when a start tag was written.
    Leave(Option<String>),
}

/// Canonicalize `input` under `variant`, writing to `out`.
pub(crate) fn canonicalize(
    variant: Variant,
    input: C14nInput<'_, '_>,
    params: &C14nParams,
    out: &mut dyn Write,
) -> Result<(), Error> {
    let (start, scope) = match input {
        C14nInput::Document(doc) => (doc.root(), Scope::Document),
        C14nInput::Subtree(node) => (node, Scope::Subtree(node.id())),
        C14nInput::NodeSet { doc, set } => (doc.root(), Scope::NodeSet(set)),
    };

    let inclusive_prefixes = match variant.namespaces {
        NamespaceMode::Exclusive => params
            .inclusive_prefixes
            .iter()
            .map(|p| {
                if p == ns::DEFAULT_PREFIX_TOKEN {
                    String::new()
                } else {
                    p.clone()
                }
            })
            .collect(),
        NamespaceMode::Inclusive => {
            if !params.inclusive_prefixes.is_empty() {
                tracing::debug!("inclusive prefix list ignored by inclusive canonicalization");
            }
            BTreeSet::new()
        }
    };

    let mut ctx = C14nContext {
        variant,
        scope,
        propagate_default: params.propagate_default_namespace
            && variant.namespaces == NamespaceMode::Exclusive
            && matches!(scope, Scope::Subtree(_)),
        inclusive_prefixes,
        tracker: NamespaceTracker::new(),
        guard: Guard::new(params.secure.clone()),
        out,
    };
    if let Scope::Subtree(_) = scope {
        ctx.seed_ancestors(start);
    }
    ctx.walk(start)
}

struct C14nContext<'s, 'w> {
    variant: Variant,
    scope: Scope<'s>,
    propagate_default: bool,
    inclusive_prefixes: BTreeSet<String>,
    tracker: NamespaceTracker,
    guard: Guard,
    out: &'w mut dyn Write,
}

impl<'s, 'w> C14nContext<'s, 'w> {
    /// Bring the declarations of the apex's ancestors into scope.
    fn seed_ancestors(&mut self, apex: Node<'_, '_>) {
        let ancestors: Vec<Node<'_, '_>> = apex
            .ancestors()
            .skip(1)
            .filter(|n| n.is_element())
            .collect();
        for ancestor in ancestors.into_iter().rev() {
            self.tracker.push(&ElementNames::of(ancestor).declarations);
        }
    }

    fn walk(&mut self, start: Node<'_, '_>) -> Result<(), Error> {
        let mut stack = vec![Step::Enter(start, false)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(node, parent_output) => match node.node_type() {
                    NodeType::Root => push_children(&mut stack, node, false),
                    NodeType::Element => {
                        let output = self.selected(node);
                        let closing = self.start_element(node, output, parent_output)?;
                        stack.push(Step::Leave(closing));
                        push_children(&mut stack, node, output);
                    }
                    NodeType::Text => {
                        if self.selected(node) && !is_top_level(node) {
                            let text = node.text().unwrap_or("");
                            self.out.write_all(escape::escape_text(text).as_bytes())?;
                        }
                    }
                    NodeType::Comment => {
                        if self.selected(node) {
                            self.guard.count_comment()?;
                            write_top_level(&mut *self.out, node, |out| write_comment(out, node))?;
                        }
                    }
                    NodeType::PI => {
                        if self.selected(node) {
                            write_top_level(&mut *self.out, node, |out| write_pi(out, node))?;
                        }
                    }
                },
                Step::Leave(closing) => {
                    if let Some(qname) = closing {
                        write!(self.out, "</{qname}>")?;
                    }
                    self.tracker.pop();
                }
            }
        }
        Ok(())
    }

    /// Whether a node reached by the walk is output.
    fn selected(&self, node: Node<'_, '_>) -> bool {
        if node.is_comment() && !self.variant.with_comments {
            return false;
        }
        match self.scope {
            Scope::Document | Scope::Subtree(_) => true,
            Scope::NodeSet(set) => match node.node_type() {
                NodeType::Comment | NodeType::PI => run_member(set, node),
                _ => set.contains(node),
            },
        }
    }

    /// Whether an arbitrary element (typically an ancestor) is output.
    fn element_output(&self, node: Node<'_, '_>) -> bool {
        match self.scope {
            Scope::Document => true,
            Scope::Subtree(apex) => node.ancestors().any(|n| n.id() == apex),
            Scope::NodeSet(set) => set.contains(node),
        }
    }

    fn ns_filter(&self) -> Option<&'s NodeSet> {
        match self.scope {
            Scope::NodeSet(set) if set.has_ns_visible() => Some(set),
            _ => None,
        }
    }

    fn start_element(
        &mut self,
        node: Node<'_, '_>,
        output: bool,
        parent_output: bool,
    ) -> Result<Option<String>, Error> {
        let names = ElementNames::of(node);
        let qname = names.qualified_name();
        self.guard
            .check_attributes(&qname, node.attributes().count() + names.declarations.len())?;
        self.tracker.push(&names.declarations);
        self.guard.check_depth(self.tracker.depth())?;

        if !output {
            self.floating_namespaces(node)?;
            return Ok(None);
        }

        self.check_prefix(&names.prefix, &qname)?;
        let attrs_excluded = matches!(self.scope, Scope::NodeSet(set) if set.excludes_attrs());
        let attrs = if attrs_excluded {
            Vec::new()
        } else {
            self.attributes(node, &names, &qname, parent_output)?
        };
        let decls = self.namespace_decls(node, &names, attrs_excluded);

        let out = &mut *self.out;
        write!(out, "<{qname}")?;
        for decl in &decls {
            decl.write_to(out)?;
        }
        for attr in &attrs {
            attr.write_to(out)?;
        }
        out.write_all(b">")?;
        Ok(Some(qname))
    }

    fn check_prefix(&self, prefix: &str, qname: &str) -> Result<(), Error> {
        if prefix.is_empty() || self.tracker.lookup(prefix).is_some() {
            Ok(())
        } else {
            Err(Error::DanglingNamespace {
                prefix: prefix.to_owned(),
                element: format!("<{qname}>"),
            })
        }
    }

    fn namespace_decls(
        &mut self,
        node: Node<'_, '_>,
        names: &ElementNames,
        attrs_excluded: bool,
    ) -> Vec<NsDecl> {
        let filter = self.ns_filter();
        let id = node.id();
        let visible = move |prefix: &str| filter.map_or(true, |set| set.is_ns_visible(id, prefix));

        match self.variant.namespaces {
            NamespaceMode::Inclusive => self.tracker.render_inclusive(visible, filter.is_some()),
            NamespaceMode::Exclusive => {
                let mut utilized = self.inclusive_prefixes.clone();
                utilized.insert(names.prefix.clone());
                if !attrs_excluded {
                    utilized.extend(
                        names
                            .attribute_prefixes
                            .iter()
                            .filter(|p| !p.is_empty())
                            .cloned(),
                    );
                }
                let at_apex = self.propagate_default
                    && matches!(self.scope, Scope::Subtree(apex) if apex == id);
                if at_apex {
                    utilized.insert(String::new());
                }
                let force_empty_default = at_apex && names.prefix.is_empty();
                self.tracker
                    .render_exclusive(&utilized, visible, force_empty_default, filter.is_some())
            }
        }
    }

    /// Namespace nodes selected on an omitted element are output as bare
    /// declarations, as the XPath data model requires.
    fn floating_namespaces(&mut self, node: Node<'_, '_>) -> Result<(), Error> {
        let Some(set) = self.ns_filter() else {
            return Ok(());
        };
        let id = node.id();
        let decls = match self.variant.namespaces {
            NamespaceMode::Inclusive => self
                .tracker
                .pending_inclusive(|prefix| set.is_ns_visible(id, prefix)),
            NamespaceMode::Exclusive if !self.inclusive_prefixes.is_empty() => {
                let listed = &self.inclusive_prefixes;
                self.tracker.pending_inclusive(|prefix| {
                    listed.contains(prefix) && set.is_ns_visible(id, prefix)
                })
            }
            NamespaceMode::Exclusive => Vec::new(),
        };
        for decl in decls.iter().filter(|d| !d.uri.is_empty()) {
            decl.write_to(&mut *self.out)?;
        }
        Ok(())
    }

    fn attributes(
        &self,
        node: Node<'_, '_>,
        names: &ElementNames,
        qname: &str,
        parent_output: bool,
    ) -> Result<Vec<Attr>, Error> {
        let mut attrs = Vec::with_capacity(names.attribute_prefixes.len());
        for (attr, prefix) in node.attributes().zip(&names.attribute_prefixes) {
            self.check_prefix(prefix, qname)?;
            attrs.push(Attr {
                ns_uri: attr.namespace().unwrap_or("").to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name: qualify(prefix, attr.name()),
                value: attr.value().to_owned(),
            });
        }
        if !parent_output && self.variant.xml_attrs != XmlAttrInheritance::None {
            self.inherit_xml_attrs(node, &mut attrs);
        }
        attrs.sort();
        Ok(attrs)
    }

    /// Add the `xml:*` attributes of omitted ancestors, nearest first, up
    /// to the nearest output ancestor.
    fn inherit_xml_attrs(&self, node: Node<'_, '_>, attrs: &mut Vec<Attr>) {
        let revision11 = self.variant.xml_attrs == XmlAttrInheritance::Revision11;
        let mut inherited: BTreeMap<String, String> = BTreeMap::new();
        let mut bases: Vec<String> = Vec::new();

        for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
            if self.element_output(ancestor) {
                break;
            }
            for attr in ancestor.attributes().filter(|a| a.namespace() == Some(ns::XML)) {
                let name = attr.name();
                if revision11 && name == ns::attr::XML_BASE {
                    bases.push(attr.value().to_owned());
                } else if !revision11 || inclusive11::is_simple_inheritable(name) {
                    inherited
                        .entry(name.to_owned())
                        .or_insert_with(|| attr.value().to_owned());
                }
            }
        }

        let has_own = |attrs: &[Attr], name: &str| {
            attrs
                .iter()
                .position(|a| a.ns_uri == ns::XML && a.local_name == name)
        };
        for (name, value) in inherited {
            if has_own(attrs, &name).is_none() {
                attrs.push(xml_attr(&name, value));
            }
        }

        if revision11 && !bases.is_empty() {
            let inherited_base = bases
                .iter()
                .rev()
                .fold(String::new(), |acc, b| inclusive11::join_uri(&acc, b));
            match has_own(attrs, ns::attr::XML_BASE) {
                Some(i) => attrs[i].value = inclusive11::join_uri(&inherited_base, &attrs[i].value),
                None if !inherited_base.is_empty() => {
                    attrs.push(xml_attr(ns::attr::XML_BASE, inherited_base));
                }
                None => {}
            }
        }
    }
}

fn xml_attr(name: &str, value: String) -> Attr {
    Attr {
        ns_uri: ns::XML.to_owned(),
        local_name: name.to_owned(),
        qualified_name: qualify(ns::XML_PREFIX, name),
        value,
    }
}

fn push_children<'a, 'input>(stack: &mut Vec<Step<'a, 'input>>, node: Node<'a, 'input>, output: bool) {
    let children: Vec<Node<'a, 'input>> = node.children().collect();
    stack.extend(children.into_iter().rev().map(|c| Step::Enter(c, output)));
}

/// A comment or PI belongs to the node-set if it, or any node of the run of
/// adjacent same-kind siblings it sits in, is a member.
fn run_member(set: &NodeSet, node: Node<'_, '_>) -> bool {
    let kind = node.node_type();
    set.contains(node)
        || successors(node.prev_sibling(), |n| n.prev_sibling())
            .take_while(|n| n.node_type() == kind)
            .any(|n| set.contains(n))
        || successors(node.next_sibling(), |n| n.next_sibling())
            .take_while(|n| n.node_type() == kind)
            .any(|n| set.contains(n))
}

// ── Serialization helpers shared with the physical variant ───────────

/// Whether `node` is a direct child of the document node.
pub(crate) fn is_top_level(node: Node<'_, '_>) -> bool {
    node.parent().is_some_and(|p| p.is_root())
}

/// Write a comment or PI, adding the line breaks that separate document
/// level nodes from the document element.
fn write_top_level(
    out: &mut dyn Write,
    node: Node<'_, '_>,
    body: impl FnOnce(&mut dyn Write) -> io::Result<()>,
) -> io::Result<()> {
    let top = is_top_level(node);
    if top && successors(node.prev_sibling(), |n| n.prev_sibling()).any(|n| n.is_element()) {
        out.write_all(b"\n")?;
    }
    body(&mut *out)?;
    if top && successors(node.next_sibling(), |n| n.next_sibling()).any(|n| n.is_element()) {
        out.write_all(b"\n")?;
    }
    Ok(())
}

pub(crate) fn write_comment(out: &mut dyn Write, node: Node<'_, '_>) -> io::Result<()> {
    write!(out, "<!--{}-->", escape::escape_pi(node.text().unwrap_or("")))
}

pub(crate) fn write_pi(out: &mut dyn Write, node: Node<'_, '_>) -> io::Result<()> {
    let Some(pi) = node.pi() else {
        return Ok(());
    };
    write!(out, "<?{}", pi.target)?;
    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
        write!(out, " {}", escape::escape_pi(value))?;
    }
    out.write_all(b"?>")
}
