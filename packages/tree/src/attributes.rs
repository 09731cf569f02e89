//! Quote-aware attribute scan over the root start tag of an html payload.
//!
//! Only the first top-level start tag is read. Leading whitespace, comments
//! and declarations are skipped; ids on descendants or inside another
//! attribute's quoted value are never seen.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<([a-zA-Z][a-zA-Z0-9:-]*)(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap()
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});

/// One attribute of a start tag; `span` covers `name=value` within the tag text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'src> {
    pub name: &'src str,
    pub value: Option<&'src str>,
    pub span: Range<usize>,
}

/// First element start tag of `code`, e.g. `<section id="hero-el">`
pub fn root_start_tag(code: &str) -> Option<&str> {
    let mut rest = code;
    loop {
        rest = rest.trim_start();
        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = match rest.find('>') {
                Some(end) => &rest[end + 1..],
                None => "",
            };
        } else {
            break;
        }
    }
    START_TAG.find(rest).map(|m| m.as_str())
}

/// Attributes of a start tag in source order
pub fn attributes(start_tag: &str) -> impl Iterator<Item = Attribute<'_>> {
    let offset = name_end(start_tag);
    let at = move |m: regex::Match<'_>| offset + m.start()..offset + m.end();
    ATTRIBUTE
        .captures_iter(&start_tag[offset..])
        .filter_map(move |caps| {
            let name = caps.get(1).map(at)?;
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| &start_tag[at(m)]);
            Some(Attribute {
                name: &start_tag[name],
                value,
                span: at(caps.get(0)?),
            })
        })
}

/// Attribute `name` (ASCII case-insensitive) of a start tag
pub fn find_attribute<'src>(start_tag: &'src str, name: &str) -> Option<Attribute<'src>> {
    attributes(start_tag).find(|attr| attr.name.eq_ignore_ascii_case(name))
}

fn name_end(start_tag: &str) -> usize {
    let after_angle = start_tag.strip_prefix('<').unwrap_or(start_tag);
    let name_len = after_angle
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(after_angle.len());
    start_tag.len() - after_angle.len() + name_len
}
