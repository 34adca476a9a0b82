#![forbid(unsafe_code)]

//! Entity escaping for C14N output.
//!
//! - Text nodes: `&` → `&amp;`, `<` → `&lt;`, `>` → `&gt;`, `\r` → `&#xD;`
//! - Attribute values: `&`, `<`, `"` → `&quot;`, `\t` → `&#x9;`,
//!   `\n` → `&#xA;`, `\r` → `&#xD;` (`>` stays literal)
//! - Comment and PI content: `\r` → `&#xD;`
//!
//! Inputs without escapable characters are returned borrowed.

use std::borrow::Cow;

/// Escape text node content.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape_with(s, |ch| match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\r' => Some("&#xD;"),
        _ => None,
    })
}

/// Escape an attribute value (also used for namespace URIs).
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape_with(s, |ch| match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '"' => Some("&quot;"),
        '\t' => Some("&#x9;"),
        '\n' => Some("&#xA;"),
        '\r' => Some("&#xD;"),
        _ => None,
    })
}

/// Escape comment text or processing instruction data.
pub fn escape_pi(s: &str) -> Cow<'_, str> {
    escape_with(s, |ch| (ch == '\r').then_some("&#xD;"))
}

fn escape_with(s: &str, replacement: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = s.find(|ch| replacement(ch).is_some()) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len() + 16);
    out.push_str(&s[..first]);
    for ch in s[first..].chars() {
        match replacement(ch) {
            Some(rep) => out.push_str(rep),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}
