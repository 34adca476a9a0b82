#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.1 (C14N 1.1).
//!
//! Algorithm URI: `http://www.w3.org/2006/12/xml-c14n11`
//! With comments: `http://www.w3.org/2006/12/xml-c14n11#WithComments`
//!
//! Namespace handling is identical to C14N 1.0.  The differences are on the
//! attribute axis of an element whose parent is omitted from the output:
//!
//! - only `xml:lang` and `xml:space` are inherited from omitted ancestors
//! - `xml:id` is never inherited
//! - `xml:base` values of omitted ancestors are joined into the element's
//!   own `xml:base` (or into a new one) by URI reference resolution

use crate::context::{self, NamespaceMode, Variant, XmlAttrInheritance};
use crate::{C14nAlgorithm, C14nInput, C14nParams};
use std::io::Write;
use stilla_core::{algorithm, ns, Error};

/// Canonical XML 1.1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inclusive11C14n {
    with_comments: bool,
}

impl Inclusive11C14n {
    pub fn new(with_comments: bool) -> Self {
        Self { with_comments }
    }
}

impl C14nAlgorithm for Inclusive11C14n {
    fn uri(&self) -> &str {
        if self.with_comments {
            algorithm::C14N11_WITH_COMMENTS
        } else {
            algorithm::C14N11
        }
    }

    fn with_comments(&self) -> bool {
        self.with_comments
    }

    fn canonicalize(
        &self,
        input: C14nInput<'_, '_>,
        params: &C14nParams,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        let variant = Variant {
            with_comments: self.with_comments,
            namespaces: NamespaceMode::Inclusive,
            xml_attrs: XmlAttrInheritance::Revision11,
        };
        context::canonicalize(variant, input, params, out)
    }
}

/// `xml:*` attributes that C14N 1.1 copies down from omitted ancestors.
pub(crate) fn is_simple_inheritable(local_name: &str) -> bool {
    local_name == ns::attr::XML_LANG || local_name == ns::attr::XML_SPACE
}

// ── xml:base resolution ──────────────────────────────────────────────

struct UriRef<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> UriRef<'a> {
    fn parse(s: &'a str) -> Self {
        let (rest, fragment) = match s.split_once('#') {
            Some((r, f)) => (r, Some(f)),
            None => (s, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, Some(q)),
            None => (rest, None),
        };
        let (scheme, rest) = match rest.find(':') {
            Some(i) if is_scheme(&rest[..i]) => (Some(&rest[..i]), &rest[i + 1..]),
            _ => (None, rest),
        };
        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, rest),
        };
        Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        }
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolve `reference` against `base`, where either may be relative.
///
/// Follows RFC 3986 section 5.2, except that a base ending in a `.` or `..`
/// segment is treated as a directory and leading `..` segments of a
/// relative result are kept.
pub(crate) fn join_uri(base: &str, reference: &str) -> String {
    if base.is_empty() {
        return reference.to_owned();
    }
    if reference.is_empty() {
        return base.to_owned();
    }

    let dir_base;
    let base = if base.ends_with("/.") || base.ends_with("/..") || base == "." || base == ".." {
        dir_base = format!("{base}/");
        dir_base.as_str()
    } else {
        base
    };

    let r = UriRef::parse(reference);
    if r.scheme.is_some() {
        return compose(r.scheme, r.authority, &remove_dot_segments(r.path), r.query, r.fragment);
    }
    let b = UriRef::parse(base);

    let (authority, path, query) = if r.authority.is_some() {
        (r.authority, remove_dot_segments(r.path), r.query)
    } else if r.path.is_empty() {
        (b.authority, b.path.to_owned(), r.query.or(b.query))
    } else if r.path.starts_with('/') {
        (b.authority, remove_dot_segments(r.path), r.query)
    } else {
        let merged = if b.authority.is_some() && b.path.is_empty() {
            format!("/{}", r.path)
        } else {
            let dir = b.path.rfind('/').map_or("", |i| &b.path[..=i]);
            format!("{dir}{}", r.path)
        };
        (b.authority, remove_dot_segments(&merged), r.query)
    };
    compose(b.scheme, authority, &path, query, r.fragment)
}

fn compose(
    scheme: Option<&str>,
    authority: Option<&str>,
    path: &str,
    query: Option<&str>,
    fragment: Option<&str>,
) -> String {
    let mut out = String::new();
    if let Some(scheme) = scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(authority) = authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(path);
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);
    let mut out: Vec<&str> = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        if i == 0 && absolute {
            continue;
        }
        match *segment {
            "." => {}
            ".." => {
                if out.last().is_some_and(|s| *s != "..") {
                    out.pop();
                } else if !absolute {
                    out.push("..");
                }
            }
            s => {
                out.push(s);
                continue;
            }
        }
        if i == last {
            out.push("");
        }
    }

    let joined = out.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
