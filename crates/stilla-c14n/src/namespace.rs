#![forbid(unsafe_code)]

//! Namespace context tracking.
//!
//! The tracker keeps two views of the namespace axis while the traversal
//! descends:
//!
//! - the bindings *in scope* at the current element, contributed by every
//!   ancestor whether or not it is output, and
//! - the bindings *rendered* by the nearest output ancestors, which decide
//!   whether a declaration has to be repeated on the current start tag.
//!
//! Both are flat maps updated in place; each element pushes one frame that
//! records how to undo its changes, so leaving an element restores the
//! parent's view without copying maps down the tree.

use crate::render::NsDecl;
use std::collections::{BTreeSet, HashMap};
use stilla_core::ns;

#[derive(Debug)]
enum Undo {
    InScope(String, Option<String>),
    Rendered(String, Option<String>),
}

#[derive(Debug, Default)]
struct Frame {
    undo: Vec<Undo>,
}

/// Per-call namespace state. Created empty, one frame per open element.
#[derive(Debug)]
pub struct NamespaceTracker {
    in_scope: HashMap<String, String>,
    rendered: HashMap<String, String>,
    frames: Vec<Frame>,
}

impl Default for NamespaceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTracker {
    pub fn new() -> Self {
        // An empty default namespace counts as already rendered, so a
        // top-level element in no namespace never emits `xmlns=""`.
        Self {
            in_scope: HashMap::new(),
            rendered: HashMap::from([(String::new(), String::new())]),
            frames: Vec::new(),
        }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Enter an element carrying `declarations` (`(prefix, uri)`, URI `""`
    /// undeclaring the default namespace).
    pub fn push(&mut self, declarations: &[(String, String)]) {
        let mut frame = Frame::default();
        for (prefix, uri) in declarations {
            if prefix == ns::XML_PREFIX {
                continue;
            }
            let previous = if uri.is_empty() {
                self.in_scope.remove(prefix)
            } else {
                self.in_scope.insert(prefix.clone(), uri.clone())
            };
            frame.undo.push(Undo::InScope(prefix.clone(), previous));
        }
        self.frames.push(frame);
    }

    /// Leave the current element, restoring both views.
    pub fn pop(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        for undo in frame.undo.into_iter().rev() {
            let (map, prefix, previous) = match undo {
                Undo::InScope(p, prev) => (&mut self.in_scope, p, prev),
                Undo::Rendered(p, prev) => (&mut self.rendered, p, prev),
            };
            match previous {
                Some(uri) => map.insert(prefix, uri),
                None => map.remove(&prefix),
            };
        }
    }

    /// The URI bound to `prefix` at the current element.
    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML);
        }
        self.in_scope.get(prefix).map(String::as_str)
    }

    fn rendered_default(&self) -> &str {
        self.rendered.get("").map(String::as_str).unwrap_or("")
    }

    fn set_rendered(&mut self, prefix: &str, uri: Option<&str>) {
        let previous = match uri {
            Some(uri) => self.rendered.insert(prefix.to_owned(), uri.to_owned()),
            None => self.rendered.remove(prefix),
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.undo.push(Undo::Rendered(prefix.to_owned(), previous));
        }
    }

    /// Declarations the inclusive algorithm must emit here, without
    /// recording them.
    ///
    /// Every visible in-scope binding that differs from what the output
    /// ancestors rendered is due, plus `xmlns=""` when the default namespace
    /// is gone but an ancestor rendered one.
    pub fn pending_inclusive(&self, visible: impl Fn(&str) -> bool) -> Vec<NsDecl> {
        let mut decls: Vec<NsDecl> = self
            .in_scope
            .iter()
            .filter(|(prefix, _)| visible(prefix.as_str()))
            .filter(|(prefix, uri)| self.rendered.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl::new(prefix, uri))
            .collect();
        let default_visible = self.in_scope.contains_key("") && visible("");
        if !default_visible && !self.rendered_default().is_empty() {
            decls.push(NsDecl::new("", ""));
        }
        decls.sort();
        decls
    }

    /// Inclusive rendering at an output element.
    ///
    /// With `prune_hidden`, rendered bindings whose namespace node is not
    /// visible here are forgotten, so descendants that see the node again
    /// re-declare it.
    pub fn render_inclusive(&mut self, visible: impl Fn(&str) -> bool, prune_hidden: bool) -> Vec<NsDecl> {
        let decls = self.pending_inclusive(&visible);
        for decl in &decls {
            self.set_rendered(&decl.prefix, Some(&decl.uri));
        }
        if prune_hidden {
            let hidden: Vec<String> = self
                .rendered
                .keys()
                .filter(|prefix| !prefix.is_empty() && !visible(prefix.as_str()))
                .cloned()
                .collect();
            for prefix in hidden {
                self.set_rendered(&prefix, None);
            }
        }
        decls
    }

    /// Exclusive rendering at an output element.
    ///
    /// Only the `utilized` prefixes are candidates.  A utilized default
    /// namespace that is not in scope renders `xmlns=""` when an output
    /// ancestor rendered a non-empty default, or unconditionally with
    /// `force_empty_default`.
    pub fn render_exclusive(
        &mut self,
        utilized: &BTreeSet<String>,
        visible: impl Fn(&str) -> bool,
        force_empty_default: bool,
        prune_hidden: bool,
    ) -> Vec<NsDecl> {
        let mut decls = Vec::new();
        for prefix in utilized {
            if prefix == ns::XML_PREFIX {
                continue;
            }
            let bound = self
                .in_scope
                .get(prefix)
                .filter(|_| visible(prefix.as_str()))
                .cloned();
            match bound {
                Some(uri) => {
                    if self.rendered.get(prefix) != Some(&uri) {
                        decls.push(NsDecl::new(prefix, &uri));
                    }
                }
                None if prefix.is_empty() => {
                    if force_empty_default || !self.rendered_default().is_empty() {
                        decls.push(NsDecl::new("", ""));
                    }
                }
                None => {}
            }
        }
        for decl in &decls {
            self.set_rendered(&decl.prefix, Some(&decl.uri));
        }
        if prune_hidden {
            for prefix in utilized {
                if !prefix.is_empty() && prefix != ns::XML_PREFIX && !visible(prefix.as_str()) {
                    self.set_rendered(prefix, None);
                }
            }
        }
        decls.sort();
        decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(prefix: &str, uri: &str) -> (String, String) {
        (prefix.to_owned(), uri.to_owned())
    }

    fn set(prefixes: &[&str]) -> BTreeSet<String> {
        prefixes.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn test_inclusive_renders_once() {
        let mut t = NamespaceTracker::new();
        t.push(&[decl("a", "urn:a"), decl("", "urn:d")]);
        let first = t.render_inclusive(|_| true, false);
        assert_eq!(first, vec![NsDecl::new("", "urn:d"), NsDecl::new("a", "urn:a")]);

        t.push(&[]);
        assert!(t.render_inclusive(|_| true, false).is_empty());
        t.pop();

        t.push(&[decl("a", "urn:other")]);
        assert_eq!(t.render_inclusive(|_| true, false), vec![NsDecl::new("a", "urn:other")]);
        t.pop();
        assert_eq!(t.lookup("a"), Some("urn:a"));
    }

    #[test]
    fn test_default_undeclaration() {
        let mut t = NamespaceTracker::new();
        t.push(&[decl("", "urn:d")]);
        t.render_inclusive(|_| true, false);
        t.push(&[decl("", "")]);
        assert_eq!(t.render_inclusive(|_| true, false), vec![NsDecl::new("", "")]);
        t.pop();
        t.pop();

        // Nothing rendered above: no undeclaration needed.
        t.push(&[decl("", "")]);
        assert!(t.render_inclusive(|_| true, false).is_empty());
    }

    #[test]
    fn test_omitted_ancestor_declarations_surface() {
        let mut t = NamespaceTracker::new();
        t.push(&[decl("a", "urn:a")]); // not output
        t.push(&[]);
        assert_eq!(t.render_inclusive(|_| true, false), vec![NsDecl::new("a", "urn:a")]);
    }

    #[test]
    fn test_exclusive_only_utilized() {
        let mut t = NamespaceTracker::new();
        t.push(&[decl("a", "urn:a"), decl("b", "urn:b"), decl("", "urn:d")]);
        let decls = t.render_exclusive(&set(&["a"]), |_| true, false, false);
        assert_eq!(decls, vec![NsDecl::new("a", "urn:a")]);

        t.push(&[]);
        let decls = t.render_exclusive(&set(&["", "a", "b"]), |_| true, false, false);
        assert_eq!(decls, vec![NsDecl::new("", "urn:d"), NsDecl::new("b", "urn:b")]);
    }

    #[test]
    fn test_exclusive_forced_empty_default() {
        let mut t = NamespaceTracker::new();
        t.push(&[]);
        assert!(t.render_exclusive(&set(&[""]), |_| true, false, false).is_empty());
        assert_eq!(
            t.render_exclusive(&set(&[""]), |_| true, true, false),
            vec![NsDecl::new("", "")]
        );
    }

    #[test]
    fn test_hidden_namespace_nodes() {
        let mut t = NamespaceTracker::new();
        t.push(&[decl("a", "urn:a"), decl("b", "urn:b")]);
        let decls = t.render_inclusive(|p| p == "a", true);
        assert_eq!(decls, vec![NsDecl::new("a", "urn:a")]);
        t.push(&[]);
        assert_eq!(t.pending_inclusive(|_| true), vec![NsDecl::new("b", "urn:b")]);
    }

    #[test]
    fn test_xml_prefix_is_implicit() {
        let mut t = NamespaceTracker::new();
        t.push(&[decl("xml", ns::XML)]);
        assert_eq!(t.lookup("xml"), Some(ns::XML));
        assert!(t.render_inclusive(|_| true, false).is_empty());
        assert_eq!(t.depth(), 1);
        t.pop();
        assert_eq!(t.depth(), 0);
    }
}
