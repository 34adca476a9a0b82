#![forbid(unsafe_code)]

//! Lexical view of element start tags.
//!
//! roxmltree resolves every QName to an (URI, local name) pair and drops
//! the prefix, but canonical XML must reproduce prefixes exactly, and the
//! physical serialization must reproduce the declaration order.  Both are
//! recovered here from the element's slice of the original text, which the
//! parser has already checked for well-formedness.

use stilla_core::ns;

/// One attribute as spelled in the start tag, namespace declarations included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub qname: &'a str,
    /// The value between the quotes, entity references unexpanded.
    pub raw_value: &'a str,
}

impl<'a> RawAttribute<'a> {
    /// The prefix bound by this attribute if it is a namespace declaration
    /// (`""` for the default namespace).
    pub fn declared_prefix(&self) -> Option<&'a str> {
        if self.qname == ns::XMLNS_PREFIX {
            return Some("");
        }
        self.qname.strip_prefix("xmlns:")
    }

    pub fn is_namespace_decl(&self) -> bool {
        self.declared_prefix().is_some()
    }
}

/// The start tag of an element: its QName and attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    pub qname: &'a str,
    pub attributes: Vec<RawAttribute<'a>>,
}

impl<'a> StartTag<'a> {
    /// Lex a start tag at the beginning of `src`.
    ///
    /// Returns `None` if `src` does not begin with a start tag.
    pub fn parse(src: &'a str) -> Option<Self> {
        let rest = src.strip_prefix('<')?;
        let name_end = rest.find(|c: char| is_xml_space(c) || c == '/' || c == '>')?;
        let qname = &rest[..name_end];
        if qname.is_empty() {
            return None;
        }
        let mut rest = &rest[name_end..];
        let mut attributes = Vec::new();
        loop {
            rest = rest.trim_start_matches(is_xml_space);
            if rest.starts_with('>') || rest.starts_with("/>") {
                break;
            }
            let eq = rest.find('=')?;
            let name = rest[..eq].trim_end_matches(is_xml_space);
            rest = rest[eq + 1..].trim_start_matches(is_xml_space);
            let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
            let body = &rest[1..];
            let close = body.find(quote)?;
            attributes.push(RawAttribute {
                qname: name,
                raw_value: &body[..close],
            });
            rest = &body[close + 1..];
        }
        Some(Self { qname, attributes })
    }

    /// Lex the start tag of an element node from its document's text.
    pub fn of<'input>(node: roxmltree::Node<'_, 'input>) -> Option<StartTag<'input>> {
        if !node.is_element() {
            return None;
        }
        let text = node.document().input_text();
        let tag = StartTag::parse(text.get(node.range())?)?;
        // Elements expanded from an entity point at the entity's
        // replacement text; reject anything that does not name the node.
        (split_qname(tag.qname).1 == node.tag_name().name()).then_some(tag)
    }

    /// The element prefix, if any.
    pub fn prefix(&self) -> Option<&'a str> {
        split_qname(self.qname).0
    }

    /// Namespace declarations in source order, as `(prefix, raw value)`.
    pub fn namespace_decls(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.attributes
            .iter()
            .filter_map(|a| a.declared_prefix().map(|p| (p, a.raw_value)))
    }

    /// Ordinary attributes in source order.
    pub fn plain_attributes(&self) -> impl Iterator<Item = &RawAttribute<'a>> + '_ {
        self.attributes.iter().filter(|a| !a.is_namespace_decl())
    }
}

/// Split `prefix:local` into its parts.
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Names of an element and its attributes with prefixes restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNames {
    /// Element prefix, `""` when unprefixed.
    pub prefix: String,
    pub local_name: String,
    /// Declarations made on this element in source order, as
    /// `(prefix, namespace URI)`; an undeclared default has URI `""`.
    pub declarations: Vec<(String, String)>,
    /// Attribute prefixes, parallel to `node.attributes()`.
    pub attribute_prefixes: Vec<String>,
}

impl ElementNames {
    /// Recover prefixes and declarations for an element node.
    ///
    /// The start tag is authoritative; when it cannot be lexed the names are
    /// reconstructed from the resolved tree.
    pub fn of(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = StartTag::of(node);
        let local_name = node.tag_name().name().to_owned();

        let prefix = match &tag {
            Some(tag) => tag.prefix().unwrap_or("").to_owned(),
            None => node
                .tag_name()
                .namespace()
                .and_then(|uri| node.lookup_prefix(uri))
                .unwrap_or("")
                .to_owned(),
        };

        let declarations = match &tag {
            Some(tag) => tag
                .namespace_decls()
                .map(|(p, _)| {
                    let uri = node
                        .lookup_namespace_uri(if p.is_empty() { None } else { Some(p) })
                        .unwrap_or("");
                    (p.to_owned(), uri.to_owned())
                })
                .collect(),
            None => declarations_from_tree(node),
        };

        let raw: Vec<&RawAttribute<'_>> = match &tag {
            Some(tag) => tag.plain_attributes().collect(),
            None => Vec::new(),
        };
        let attribute_prefixes = node
            .attributes()
            .enumerate()
            .map(|(i, attr)| {
                if let Some(raw) = raw.get(i) {
                    let (p, local) = split_qname(raw.qname);
                    if local == attr.name() {
                        return p.unwrap_or("").to_owned();
                    }
                }
                match attr.namespace() {
                    Some(ns::XML) => ns::XML_PREFIX.to_owned(),
                    Some(uri) => node.lookup_prefix(uri).unwrap_or("").to_owned(),
                    None => String::new(),
                }
            })
            .collect();

        Self {
            prefix,
            local_name,
            declarations,
            attribute_prefixes,
        }
    }

    /// `prefix:local` or `local`.
    pub fn qualified_name(&self) -> String {
        qualify(&self.prefix, &self.local_name)
    }
}

/// Join a prefix and a local name.
pub fn qualify(prefix: &str, local_name: &str) -> String {
    if prefix.is_empty() {
        local_name.to_owned()
    } else {
        format!("{prefix}:{local_name}")
    }
}

/// Declarations on `node` inferred by comparing its in-scope namespaces with
/// its parent's.
fn declarations_from_tree(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let parent_scope: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|n| (n.name(), n.uri())).collect())
        .unwrap_or_default();
    let own_scope: Vec<(Option<&str>, &str)> =
        node.namespaces().map(|n| (n.name(), n.uri())).collect();

    let mut decls: Vec<(String, String)> = own_scope
        .iter()
        .filter(|binding| !parent_scope.contains(binding))
        .filter(|(name, _)| *name != Some(ns::XML_PREFIX))
        .map(|(name, uri)| (name.unwrap_or("").to_owned(), (*uri).to_owned()))
        .collect();

    let parent_default = parent_scope.iter().any(|(n, uri)| n.is_none() && !uri.is_empty());
    let own_default = own_scope.iter().any(|(n, uri)| n.is_none() && !uri.is_empty());
    if parent_default && !own_default {
        decls.push((String::new(), String::new()));
    }
    decls
}
