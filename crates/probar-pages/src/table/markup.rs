//! Lenient HTML fragment reader.
//!
//! Only what table and toast extraction need: elements with attributes, text,
//! comments, void tags and the implicit closing of `td`/`th`/`tr`/`li`/`option`.
//! Scripts, CDATA and namespaces are not interpreted.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::result::{PagesError, PagesResult};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?s)<!--(.*?)-->|<!\w[^>]*>|<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
        )
        .unwrap_or_else(|e| unreachable!("token pattern is valid: {e}"))
    })
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .unwrap_or_else(|e| unreachable!("attribute pattern is valid: {e}"))
    })
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);")
            .unwrap_or_else(|e| unreachable!("entity pattern is valid: {e}"))
    })
}

/// Decode the character references that show up in rendered markup
#[must_use]
pub fn decode_entities(text: &str) -> String {
    entity_re()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let hex = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X"));
            let decoded = if let Some(hex) = hex {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

// =============================================================================
// TREE
// =============================================================================

/// A node below an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    /// Nested element
    Element(Element),
    /// Text run (entities decoded)
    Text(String),
    /// Comment
    Comment(String),
}

/// A parsed element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Lower-case tag name
    pub tag: String,
    /// Attributes in source order, names lower-cased
    pub attributes: Vec<(String, String)>,
    /// Child nodes in source order
    pub children: Vec<Child>,
}

impl Element {
    fn new(tag: &str, attributes: Vec<(String, String)>) -> Self {
        Self {
            tag: tag.to_string(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Value of attribute `name`
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the `class` attribute contains `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Text before the first child node, `None` when there is none
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Child::Text(t) => text.push_str(t),
                _ => break,
            }
        }
        (!text.is_empty()).then_some(text)
    }

    /// All text below this element, concatenated
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Child::Text(t) => out.push_str(t),
                Child::Element(e) => e.collect_text(out),
                Child::Comment(_) => {}
            }
        }
    }

    /// Child elements, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Child::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Depth-first search for the first descendant satisfying `predicate`
    #[must_use]
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.elements() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find(predicate) {
                return Some(found);
            }
        }
        None
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for caps in attr_re().captures_iter(raw) {
        let name = caps[1].to_ascii_lowercase();
        if attributes.iter().any(|(existing, _)| *existing == name) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or_else(String::new, |m| decode_entities(m.as_str()));
        attributes.push((name, value));
    }
    attributes
}

/// Tags an opening `tag` implicitly closes when they are the innermost open element
fn implicitly_closed_by(tag: &str) -> &'static [&'static str] {
    match tag {
        "td" | "th" => &["td", "th"],
        "tr" => &["td", "th", "tr"],
        "thead" | "tbody" | "tfoot" => &["td", "th", "tr", "thead", "tbody", "tfoot"],
        "li" => &["li"],
        "option" => &["option"],
        _ => &[],
    }
}

struct TreeBuilder {
    roots: Vec<Child>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn push(&mut self, child: Child) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(child),
            None => self.roots.push(child),
        }
    }

    fn close_top(&mut self) {
        if let Some(done) = self.open.pop() {
            self.push(Child::Element(done));
        }
    }

    fn open_element(&mut self, tag: &str, attributes: Vec<(String, String)>, self_closing: bool) {
        let closes = implicitly_closed_by(tag);
        while self
            .open
            .last()
            .is_some_and(|top| closes.contains(&top.tag.as_str()))
        {
            self.close_top();
        }
        let element = Element::new(tag, attributes);
        if self_closing || VOID_TAGS.contains(&tag) {
            self.push(Child::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn close_element(&mut self, tag: &str) {
        if let Some(depth) = self.open.iter().rposition(|e| e.tag == tag) {
            while self.open.len() > depth {
                self.close_top();
            }
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        if let Some(Child::Text(previous)) = self
            .open
            .last_mut()
            .map_or(self.roots.last_mut(), |e| e.children.last_mut())
        {
            previous.push_str(&decoded);
            return;
        }
        self.push(Child::Text(decoded));
    }

    fn finish(mut self) -> Vec<Child> {
        while !self.open.is_empty() {
            self.close_top();
        }
        self.roots
    }
}

/// Parse markup into its top-level nodes
#[must_use]
pub fn parse_fragments(markup: &str) -> Vec<Child> {
    let mut builder = TreeBuilder {
        roots: Vec::new(),
        open: Vec::new(),
    };
    let mut cursor = 0;
    for caps in token_re().captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        builder.text(&markup[cursor..whole.start()]);
        cursor = whole.end();

        if let Some(comment) = caps.get(1) {
            builder.push(Child::Comment(comment.as_str().to_string()));
            continue;
        }
        let Some(tag) = caps.get(3) else {
            // doctype and other declarations
            continue;
        };
        let tag = tag.as_str().to_ascii_lowercase();
        if caps.get(2).is_some_and(|slash| !slash.as_str().is_empty()) {
            builder.close_element(&tag);
        } else {
            let attributes = caps
                .get(4)
                .map(|raw| parse_attributes(raw.as_str()))
                .unwrap_or_default();
            let self_closing = caps.get(5).is_some_and(|slash| !slash.as_str().is_empty());
            builder.open_element(&tag, attributes, self_closing);
        }
    }
    builder.text(&markup[cursor..]);
    builder.finish()
}

/// Parse markup that must contain one element (surrounding whitespace allowed)
pub fn parse_element(markup: &str) -> PagesResult<Element> {
    parse_fragments(markup)
        .into_iter()
        .find_map(|child| match child {
            Child::Element(e) => Some(e),
            _ => None,
        })
        .ok_or_else(|| PagesError::markup("Document is empty"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod entity_tests {
        use super::*;

        #[test]
        fn test_named_and_numeric() {
            assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42;"), "a & b <c> AB");
            assert_eq!(decode_entities("&unknown; &"), "&unknown; &");
        }
    }

    mod tree_tests {
        use super::*;

        #[test]
        fn test_text_stops_at_first_child() {
            let markup = r#"<th psortablecolumn="id"> #<i class="x"></i> tail</th>"#;
            let el = parse_element(markup).unwrap();
            assert_eq!(el.tag, "th");
            assert_eq!(el.attribute("psortablecolumn"), Some("id"));
            assert_eq!(el.text().as_deref(), Some(" #"));
            assert_eq!(el.text_content(), " # tail");
        }

        #[test]
        fn test_comment_ends_text() {
            let el = parse_element("<td><!---->Name</td>").unwrap();
            assert_eq!(el.text(), None);
            assert_eq!(el.text_content(), "Name");
        }

        #[test]
        fn test_implicit_close() {
            let el = parse_element("<tr><td>1<td>2</tr>").unwrap();
            let cells: Vec<_> = el.elements().map(|c| c.text()).collect();
            assert_eq!(cells, vec![Some("1".to_string()), Some("2".to_string())]);
        }

        #[test]
        fn test_void_and_self_closing() {
            let markup = r#"<td><input type="checkbox"><br/><span data-e2e='x'>s</span></td>"#;
            let el = parse_element(markup).unwrap();
            let tags: Vec<_> = el.elements().map(|c| c.tag.as_str()).collect();
            assert_eq!(tags, vec!["input", "br", "span"]);
            assert_eq!(
                el.find(&|e| e.attribute("data-e2e") == Some("x")).map(|e| e.tag.as_str()),
                Some("span")
            );
        }

        #[test]
        fn test_valueless_and_unquoted_attributes() {
            let markup = "<button disabled class=btn-ok CLASS=ignored>OK</button>";
            let el = parse_element(markup).unwrap();
            assert_eq!(el.attribute("disabled"), Some(""));
            assert_eq!(el.attribute("class"), Some("btn-ok"));
            assert!(el.has_class("btn-ok"));
        }

        #[test]
        fn test_stray_close_ignored() {
            let roots = parse_fragments("<div>a</span>b</div>");
            assert_eq!(roots.len(), 1);
            match &roots[0] {
                Child::Element(div) => assert_eq!(div.text_content(), "ab"),
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_empty_document() {
            assert!(matches!(parse_element("  \n "), Err(PagesError::Markup { .. })));
        }
    }
}
