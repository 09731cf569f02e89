//! # HTML Fragments
//!
//! The compiler only needs one capability from an HTML parser: find the single
//! root element of a fragment, set its inner content and serialize it back.
//! Fragments are scanned with a small logos tokenizer; everything outside the
//! root start tag and end tag is copied through byte-for-byte.
//!
//! ```text
//! <!-- hero -->  <section id="hero-el" class="x">  ...  </section>
//! └─ prefix ──┘  └──────── start tag ────────────┘└inner┘└ end tag ┘
//! ```

use logos::{Lexer, Logos};
use std::ops::Range;
use vibe_tree::attributes::find_attribute;

/// Attribute carrying the node id on every rendered root element
pub const TRACE_ATTRIBUTE: &str = "data-node-id";

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlToken {
    #[token("<!--", skip_comment)]
    Comment,

    #[regex(r"<![a-zA-Z][^>]*>")]
    Declaration,

    #[regex(r#"<[a-zA-Z][a-zA-Z0-9:-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:-]*[ \t\r\n]*>")]
    EndTag,

    #[regex(r"[^<]+")]
    Text,

    #[token("<")]
    StrayAngle,
}

fn skip_comment(lex: &mut Lexer<HtmlToken>) -> bool {
    let consumed = match lex.remainder().find("-->") {
        Some(end) => end + 3,
        None => lex.remainder().len(),
    };
    lex.bump(consumed);
    true
}

/// Why a fragment could not be nested into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// Code is empty or whitespace
    Empty,
    /// Code has content but no element
    NoElement,
    /// More than one top-level element
    MultipleRoots,
    /// Non-whitespace text beside the root element
    TopLevelText,
    /// Root is a void element (img, br, ...) and cannot hold children
    VoidElement,
}

impl DegradeReason {
    pub fn describe(&self) -> &'static str {
        match self {
            DegradeReason::Empty => "empty fragment",
            DegradeReason::NoElement => "fragment has no element",
            DegradeReason::MultipleRoots => "fragment has multiple top-level elements",
            DegradeReason::TopLevelText => "fragment has text beside its root element",
            DegradeReason::VoidElement => "root element is a void element",
        }
    }
}

/// Location of the single root element inside a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    pub name: String,
    pub start_tag: Range<usize>,
    pub inner: Range<usize>,
    /// `None` when the source never closes the root
    pub end_tag: Option<Range<usize>>,
    pub self_closing: bool,
}

impl RootElement {
    pub fn is_void(&self) -> bool {
        is_void_element(&self.name)
    }
}

/// A parsed html payload
#[derive(Debug, Clone)]
pub struct Fragment<'src> {
    source: &'src str,
    shape: Result<RootElement, DegradeReason>,
}

/// Output of rendering one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    /// Set when children were appended as siblings instead of nested
    pub degraded: Option<DegradeReason>,
}

impl<'src> Fragment<'src> {
    pub fn parse(source: &'src str) -> Self {
        Self {
            source,
            shape: scan(source),
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn root(&self) -> Option<&RootElement> {
        self.shape.as_ref().ok()
    }

    /// Reason this fragment has no usable single root
    pub fn degradation(&self) -> Option<DegradeReason> {
        self.shape.as_ref().err().copied()
    }

    /// Tag the root element with `node_id` and keep its content
    pub fn tag(&self, node_id: &str) -> String {
        match &self.shape {
            Ok(root) => {
                let start = &self.source[root.start_tag.clone()];
                let mut out = String::with_capacity(self.source.len() + node_id.len() + 16);
                out.push_str(&self.source[..root.start_tag.start]);
                out.push_str(&tag_start(start, node_id, false));
                out.push_str(&self.source[root.start_tag.end..]);
                out
            }
            Err(_) => self.source.to_string(),
        }
    }

    /// Tag the root element and replace its inner content with `children`
    ///
    /// Degrades to `source + children` when there is no single root that can
    /// hold content.
    pub fn nest(&self, node_id: &str, children: &str) -> Rendered {
        let root = match &self.shape {
            Ok(root) if !root.is_void() => root,
            Ok(_) => {
                return Rendered {
                    html: format!("{}{}", self.tag(node_id), children),
                    degraded: Some(DegradeReason::VoidElement),
                }
            }
            Err(reason) => {
                return Rendered {
                    html: format!("{}{}", self.source, children),
                    degraded: Some(*reason),
                }
            }
        };

        let start = &self.source[root.start_tag.clone()];
        let mut out = String::with_capacity(self.source.len() + children.len() + 32);
        out.push_str(&self.source[..root.start_tag.start]);
        out.push_str(&tag_start(start, node_id, root.self_closing));
        out.push_str(children);

        let suffix_start = match (&root.end_tag, root.self_closing) {
            (Some(end_tag), false) => {
                out.push_str(&self.source[end_tag.clone()]);
                end_tag.end
            }
            (None, false) => {
                out.push_str(&format!("</{}>", root.name));
                self.source.len()
            }
            (_, true) => {
                out.push_str(&format!("</{}>", root.name));
                root.start_tag.end
            }
        };
        out.push_str(&self.source[suffix_start..]);

        Rendered {
            html: out,
            degraded: None,
        }
    }
}

/// Insert or overwrite the trace attribute; `open` turns `<x/>` into `<x>`
fn tag_start(start_tag: &str, node_id: &str, open: bool) -> String {
    let attribute = format!(" {}=\"{}\"", TRACE_ATTRIBUTE, escape_attribute(node_id));

    let (head, tail) = if let Some(head) = start_tag.strip_suffix("/>") {
        (head.trim_end(), if open { ">" } else { " />" })
    } else if let Some(head) = start_tag.strip_suffix('>') {
        (head, ">")
    } else {
        (start_tag, "")
    };

    match find_attribute(head, TRACE_ATTRIBUTE) {
        Some(existing) => format!(
            "{}{}{}{tail}",
            &head[..existing.span.start],
            attribute.trim_start(),
            &head[existing.span.end..]
        ),
        None => format!("{head}{attribute}{tail}"),
    }
}

fn scan(source: &str) -> Result<RootElement, DegradeReason> {
    if source.trim().is_empty() {
        return Err(DegradeReason::Empty);
    }

    let mut lex = HtmlToken::lexer(source);
    let mut open: Vec<String> = Vec::new();
    let mut root: Option<RootElement> = None;
    let mut roots = 0usize;
    let mut stray_text = false;

    while let Some(token) = lex.next() {
        let span = lex.span();
        let slice = lex.slice();

        match token {
            Ok(HtmlToken::Comment) | Ok(HtmlToken::Declaration) => {}
            Ok(HtmlToken::Text) | Ok(HtmlToken::StrayAngle) | Err(_) => {
                if open.is_empty() && !slice.trim().is_empty() {
                    stray_text = true;
                }
            }
            Ok(HtmlToken::StartTag) => {
                let name = tag_name(&slice[1..]);
                let self_closing = slice.ends_with("/>");

                if open.is_empty() {
                    roots += 1;
                    if roots == 1 {
                        root = Some(RootElement {
                            name: name.clone(),
                            start_tag: span.clone(),
                            inner: span.end..span.end,
                            end_tag: None,
                            self_closing,
                        });
                    }
                }

                if self_closing || is_void_element(&name) {
                    continue;
                }

                if is_raw_text_element(&name) {
                    let closing = format!("</{name}");
                    let skip = lex
                        .remainder()
                        .to_ascii_lowercase()
                        .find(&closing)
                        .unwrap_or(lex.remainder().len());
                    lex.bump(skip);
                }

                open.push(name);
            }
            Ok(HtmlToken::EndTag) => {
                let name = tag_name(&slice[2..]);
                // Unmatched end tags are ignored, like a browser would
                if let Some(depth) = open.iter().rposition(|n| *n == name) {
                    open.truncate(depth);
                    if open.is_empty() && roots == 1 {
                        if let Some(root) = root.as_mut() {
                            root.inner = root.start_tag.end..span.start;
                            root.end_tag = Some(span.clone());
                        }
                    }
                }
            }
        }
    }

    match root {
        None => Err(DegradeReason::NoElement),
        Some(_) if roots > 1 => Err(DegradeReason::MultipleRoots),
        Some(_) if stray_text => Err(DegradeReason::TopLevelText),
        Some(mut root) => {
            if root.end_tag.is_none() && !root.self_closing && !root.is_void() {
                root.inner = root.start_tag.end..source.len();
            }
            Ok(root)
        }
    }
}

fn tag_name(after_angle: &str) -> String {
    after_angle
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "img"
            | "input"
            | "br"
            | "hr"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "col"
            | "embed"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

pub(crate) fn escape_attribute(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_root_is_found() {
        let source = r#"<section id="hero-el"><h1>Old</h1></section>"#;
        let fragment = Fragment::parse(source);

        let root = fragment.root().unwrap();
        assert_eq!(root.name, "section");
        assert_eq!(&source[root.inner.clone()], "<h1>Old</h1>");
    }

    #[test]
    fn test_surrounding_comments_and_whitespace_allowed() {
        let source = "\n  <!-- hero > banner -->\n<div class=\"a\">x</div>\n";
        let fragment = Fragment::parse(source);

        assert!(fragment.root().is_some());
        let rendered = fragment.nest("hero", "<p>new</p>");
        assert_eq!(
            rendered.html,
            "\n  <!-- hero > banner -->\n<div class=\"a\" data-node-id=\"hero\"><p>new</p></div>\n"
        );
        assert_eq!(rendered.degraded, None);
    }

    #[test]
    fn test_nested_same_name_elements() {
        let source = "<div><div>inner</div></div>";
        let root = Fragment::parse(source).root().cloned().unwrap();
        assert_eq!(root.end_tag, Some(21..27));
        assert_eq!(&source[root.inner], "<div>inner</div>");
    }

    #[test]
    fn test_multiple_roots_degrade() {
        let fragment = Fragment::parse("<h1>A</h1><p>B</p>");
        assert_eq!(fragment.degradation(), Some(DegradeReason::MultipleRoots));

        let rendered = fragment.nest("intro", "<span>c</span>");
        assert_eq!(rendered.html, "<h1>A</h1><p>B</p><span>c</span>");
        assert_eq!(rendered.degraded, Some(DegradeReason::MultipleRoots));
    }

    #[test]
    fn test_text_only_and_empty() {
        assert_eq!(
            Fragment::parse("just words").degradation(),
            Some(DegradeReason::NoElement)
        );
        assert_eq!(Fragment::parse("  \n").degradation(), Some(DegradeReason::Empty));
        assert_eq!(
            Fragment::parse("hello <b>world</b>").degradation(),
            Some(DegradeReason::TopLevelText)
        );
    }

    #[test]
    fn test_void_root_appends_children() {
        let fragment = Fragment::parse(r#"<img src="a.png">"#);
        let rendered = fragment.nest("logo", "<p>caption</p>");

        assert_eq!(
            rendered.html,
            r#"<img src="a.png" data-node-id="logo"><p>caption</p>"#
        );
        assert_eq!(rendered.degraded, Some(DegradeReason::VoidElement));
    }

    #[test]
    fn test_self_closing_root_is_opened() {
        let rendered = Fragment::parse("<div class=\"slot\"/>").nest("slot", "<b>x</b>");
        assert_eq!(
            rendered.html,
            "<div class=\"slot\" data-node-id=\"slot\"><b>x</b></div>"
        );
    }

    #[test]
    fn test_unclosed_root_is_closed() {
        let rendered = Fragment::parse("<main><p>a</p>").nest("main", "<p>b</p>");
        assert_eq!(rendered.html, "<main data-node-id=\"main\"><p>b</p></main>");
    }

    #[test]
    fn test_attribute_values_with_angle_brackets() {
        let source = r#"<button onclick="if (a > b) go()">Go</button>"#;
        let tagged = Fragment::parse(source).tag("cta");
        assert_eq!(
            tagged,
            r#"<button onclick="if (a > b) go()" data-node-id="cta">Go</button>"#
        );
    }

    #[test]
    fn test_existing_trace_attribute_is_replaced() {
        let tagged = Fragment::parse(r#"<div data-node-id="old" id="x"></div>"#).tag("new");
        assert_eq!(tagged, r#"<div data-node-id="new" id="x"></div>"#);
    }

    #[test]
    fn test_trace_attribute_text_inside_other_values_is_kept() {
        let source = r#"<div title=" data-node-id='x'" data-node-id=old>y</div>"#;
        assert_eq!(
            Fragment::parse(source).tag("new"),
            r#"<div title=" data-node-id='x'" data-node-id="new">y</div>"#
        );

        let source = r#"<p data-note="a data-node-id=b"></p>"#;
        assert_eq!(
            Fragment::parse(source).tag("p1"),
            r#"<p data-note="a data-node-id=b" data-node-id="p1"></p>"#
        );
    }

    #[test]
    fn test_script_content_is_opaque() {
        let source = "<div><script>if (a < b) { document.write('</div>'); }</script></div>";
        let fragment = Fragment::parse(source);
        let root = fragment.root().unwrap();
        assert_eq!(root.end_tag.as_ref().map(|r| r.end), Some(source.len()));
    }

    #[test]
    fn test_tag_escapes_node_id() {
        let tagged = Fragment::parse("<p></p>").tag("a\"b");
        assert_eq!(tagged, "<p data-node-id=\"a&quot;b\"></p>");
    }
}
