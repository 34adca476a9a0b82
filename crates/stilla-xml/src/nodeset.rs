#![forbid(unsafe_code)]

//! NodeSet type for document-subset canonicalization.
//!
//! A `NodeSet` is the result of a path query over a document: a possibly
//! sparse set of tree nodes identified by their `NodeId`.  Document order is
//! never stored here; canonicalization walks the tree and only asks for
//! membership.

use roxmltree::{Document, Node, NodeId};
use std::collections::{HashMap, HashSet};

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
    /// Optional namespace node visibility map.
    ///
    /// In the XPath data model every element carries one namespace node per
    /// in-scope binding, and a query can select them independently of the
    /// element.  When `Some`, maps `(element, prefix)` → visible, with `""`
    /// for the default namespace.  When `None`, every namespace node of a
    /// member element is visible.
    ns_visible: Option<HashMap<(NodeId, String), bool>>,
    /// Set when the query selected elements but not their attribute nodes.
    exclude_attrs: bool,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node set from the given nodes.
    pub fn from_nodes<'a, 'input: 'a>(nodes: impl IntoIterator<Item = Node<'a, 'input>>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| n.id()).collect(),
            ..Self::default()
        }
    }

    /// Create a node set containing all nodes in the document.
    pub fn all(doc: &Document<'_>) -> Self {
        Self::from_nodes(doc.descendants())
    }

    /// All nodes except comments, the selection of a `URI=""` reference.
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::from_nodes(doc.descendants().filter(|n| !n.is_comment()))
    }

    /// The subtree rooted at `root`, optionally keeping comments.
    pub fn tree(root: Node<'_, '_>, with_comments: bool) -> Self {
        Self::from_nodes(
            root.descendants()
                .filter(|n| with_comments || !n.is_comment()),
        )
    }

    /// Check if a node is in this set.
    pub fn contains(&self, node: Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Add a node to this set.
    pub fn insert(&mut self, node: Node<'_, '_>) {
        self.nodes.insert(node.id());
    }

    /// Remove a node from this set.
    pub fn remove(&mut self, node: Node<'_, '_>) {
        self.nodes.remove(&node.id());
    }

    /// Compute the intersection of two node sets.
    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.intersection(&other.nodes).copied().collect(),
            ns_visible: merge_ns_visible_intersection(&self.ns_visible, &other.ns_visible),
            exclude_attrs: self.exclude_attrs || other.exclude_attrs,
        }
    }

    /// Compute the union of two node sets.
    pub fn union(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.union(&other.nodes).copied().collect(),
            ns_visible: merge_ns_visible_union(&self.ns_visible, &other.ns_visible),
            exclude_attrs: self.exclude_attrs && other.exclude_attrs,
        }
    }

    /// Compute self - other.
    pub fn subtract(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.difference(&other.nodes).copied().collect(),
            ns_visible: merge_ns_visible_subtract(&self.ns_visible, &other.ns_visible),
            exclude_attrs: self.exclude_attrs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Restrict namespace nodes to the visible entries of `map`.
    pub fn set_ns_visible(&mut self, map: HashMap<(NodeId, String), bool>) {
        self.ns_visible = Some(map);
    }

    /// Whether the namespace node for `prefix` on `element` is selected.
    pub fn is_ns_visible(&self, element: NodeId, prefix: &str) -> bool {
        match &self.ns_visible {
            None => true,
            Some(map) => map
                .get(&(element, prefix.to_owned()))
                .copied()
                .unwrap_or(false),
        }
    }

    pub fn has_ns_visible(&self) -> bool {
        self.ns_visible.is_some()
    }

    pub fn set_exclude_attrs(&mut self, val: bool) {
        self.exclude_attrs = val;
    }

    /// Check if attribute nodes are excluded from this node set.
    pub fn excludes_attrs(&self) -> bool {
        self.exclude_attrs
    }
}

type NsVisibility = Option<HashMap<(NodeId, String), bool>>;

/// Intersection: a namespace node must be visible on both sides.
fn merge_ns_visible_intersection(a: &NsVisibility, b: &NsVisibility) -> NsVisibility {
    match (a, b) {
        (None, None) => None,
        (Some(m), None) | (None, Some(m)) => Some(m.clone()),
        (Some(ma), Some(mb)) => Some(
            ma.iter()
                .filter(|(k, v)| **v && mb.get(*k).copied().unwrap_or(false))
                .map(|(k, _)| (k.clone(), true))
                .collect(),
        ),
    }
}

/// Union: either side suffices; an unrestricted side makes everything visible.
fn merge_ns_visible_union(a: &NsVisibility, b: &NsVisibility) -> NsVisibility {
    match (a, b) {
        (None, _) | (_, None) => None,
        (Some(ma), Some(mb)) => {
            let mut result = ma.clone();
            for (k, v) in mb {
                if *v {
                    result.insert(k.clone(), true);
                }
            }
            Some(result)
        }
    }
}

/// Subtraction: hide whatever the other side shows.
fn merge_ns_visible_subtract(a: &NsVisibility, b: &NsVisibility) -> NsVisibility {
    match (a, b) {
        (None, None) => None,
        (Some(m), None) => Some(m.clone()),
        (base, Some(mb)) => {
            let mut result = base.clone().unwrap_or_default();
            for (k, v) in mb {
                if *v {
                    result.insert(k.clone(), false);
                }
            }
            Some(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = "<r><a><!--c--><b/></a><d/></r>";

    fn find<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Node<'a, 'input> {
        doc.descendants().find(|n| n.has_tag_name(name)).unwrap()
    }

    #[test]
    fn test_tree_with_and_without_comments() {
        let doc = Document::parse(XML).unwrap();
        let a = find(&doc, "a");
        let comment = doc.descendants().find(|n| n.is_comment()).unwrap();

        let with = NodeSet::tree(a, true);
        assert!(with.contains(a));
        assert!(with.contains(comment));
        assert!(with.contains(find(&doc, "b")));
        assert!(!with.contains(find(&doc, "d")));

        let without = NodeSet::tree(a, false);
        assert!(!without.contains(comment));
        assert_eq!(with.len(), without.len() + 1);
    }

    #[test]
    fn test_set_operations() {
        let doc = Document::parse(XML).unwrap();
        let all = NodeSet::all(&doc);
        let subtree = NodeSet::tree(find(&doc, "a"), true);

        let rest = all.subtract(&subtree);
        assert!(rest.contains(find(&doc, "d")));
        assert!(!rest.contains(find(&doc, "b")));

        assert_eq!(rest.union(&subtree).len(), all.len());
        assert_eq!(rest.intersection(&subtree).len(), 0);
        assert!(rest.intersection(&subtree).is_empty());
    }

    #[test]
    fn test_all_without_comments() {
        let doc = Document::parse(XML).unwrap();
        let set = NodeSet::all_without_comments(&doc);
        assert_eq!(set.len(), NodeSet::all(&doc).len() - 1);
    }

    #[test]
    fn test_ns_visibility_merge() {
        let doc = Document::parse(XML).unwrap();
        let a = find(&doc, "a").id();
        let mut left = NodeSet::all(&doc);
        let right = NodeSet::all(&doc);
        assert!(left.is_ns_visible(a, "p"));

        left.set_ns_visible(HashMap::from([((a, "p".to_owned()), true)]));
        assert!(left.is_ns_visible(a, "p"));
        assert!(!left.is_ns_visible(a, "q"));

        assert!(!left.union(&right).has_ns_visible());
        let both = left.intersection(&right);
        assert!(both.is_ns_visible(a, "p"));
        let hidden = right.subtract(&left);
        assert!(!hidden.is_ns_visible(a, "p"));
    }

    #[test]
    fn test_insert_remove() {
        let doc = Document::parse(XML).unwrap();
        let d = find(&doc, "d");
        let mut set = NodeSet::new();
        set.insert(d);
        assert!(set.contains_id(d.id()));
        set.remove(d);
        assert!(set.is_empty());
    }
}
