//! Lenient HTML fragment parsing on top of quick-xml.
//!
//! quick-xml tokenizes the markup; the tree builder here supplies the bits of
//! HTML that XML does not know about:
//!
//! - void elements (`<img src="...">`) never open a scope, whether or not
//!   they are written self-closing
//! - end tags close up to the nearest open element with the same name and
//!   stray end tags are ignored
//! - `html`, `head` and `body` are transparent
//! - attributes may be unquoted or valueless (`html_attributes`)
//! - character references decode as browsers decode them: HTML5 named
//!   entities and numeric references resolve, and an `&` that does not start
//!   a known reference (`?w=1500&h=1000`, `&bogus;`) stays literal
//!
//! Comments, doctype and processing instructions are dropped.

use super::{Document, NodeId, is_void};
use quick_xml::Reader;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity};
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed markup near byte {position}: {source}")]
    Syntax {
        position: u64,
        source: quick_xml::Error,
    },
}

const TRANSPARENT: &[&str] = &["html", "head", "body"];

/// Longest reference name considered, in bytes, not counting `&` and `;`.
const MAX_REFERENCE_LEN: usize = 32;

/// Decode character references in raw text or attribute values.
fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let reference = after
            .find(';')
            .filter(|&end| end <= MAX_REFERENCE_LEN)
            .and_then(|end| resolve_reference(&after[..end]).map(|text| (end, text)));
        match reference {
            Some((end, text)) => {
                out.push_str(&text);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Resolve the body of `&name;`, `&#NNN;` or `&#xHHH;`.
fn resolve_reference(name: &str) -> Option<Cow<'static, str>> {
    if let Some(number) = name.strip_prefix('#') {
        let (digits, radix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (number, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let code = u32::from_str_radix(digits, radix).ok()?;
        return char::from_u32(code)
            .filter(|&c| c != '\0')
            .map(|c| Cow::Owned(c.to_string()));
    }
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    resolve_predefined_entity(name)
        .or_else(|| resolve_html5_entity(name))
        .map(Cow::Borrowed)
}

impl Document {
    /// Parse `markup` into detached nodes owned by this document.
    ///
    /// Returns the top-level nodes in order; nested nodes are already linked
    /// to their parents.
    pub fn parse_fragment(&mut self, markup: &str) -> Result<Vec<NodeId>, ParseError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().check_end_names = false;

        let mut roots = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(source) => {
                    return Err(ParseError::Syntax {
                        position: reader.buffer_position() as u64,
                        source,
                    });
                }
            };
            match event {
                Event::Start(start) => {
                    if let Some(element) = self.open_element(&reader, &start, &mut roots, &open)? {
                        if !self.tag(element).is_some_and(is_void) {
                            open.push(element);
                        }
                    }
                }
                Event::Empty(start) => {
                    self.open_element(&reader, &start, &mut roots, &open)?;
                }
                Event::End(end) => {
                    let tag = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                    if TRANSPARENT.contains(&tag.as_str()) || is_void(&tag) {
                        continue;
                    }
                    if let Some(pos) = open.iter().rposition(|&n| self.tag(n) == Some(tag.as_str()))
                    {
                        open.truncate(pos);
                    }
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text);
                    let text = decode_entities(&raw);
                    if text.is_empty() {
                        continue;
                    }
                    let node = self.create_text(&text);
                    self.attach(&mut roots, &open, node);
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    let node = self.create_text(&text);
                    self.attach(&mut roots, &open, node);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(roots)
    }

    /// Create the element for a start tag and link it into the tree.
    /// Returns `None` for transparent tags.
    fn open_element(
        &mut self,
        reader: &Reader<&[u8]>,
        start: &BytesStart<'_>,
        roots: &mut Vec<NodeId>,
        open: &[NodeId],
    ) -> Result<Option<NodeId>, ParseError> {
        let tag = tag_name(start);
        if TRANSPARENT.contains(&tag.as_str()) {
            return Ok(None);
        }
        let element = self
            .element_from_start(&tag, start)
            .map_err(|source| ParseError::Syntax {
                position: reader.buffer_position() as u64,
                source,
            })?;
        self.attach(roots, open, element);
        Ok(Some(element))
    }

    fn element_from_start(
        &mut self,
        tag: &str,
        start: &BytesStart<'_>,
    ) -> Result<NodeId, quick_xml::Error> {
        let element = self.create_element(tag);
        for attr in start.html_attributes() {
            let attr = attr?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let raw = String::from_utf8_lossy(&attr.value);
            self.set_attr(element, &name, &decode_entities(&raw));
        }
        Ok(element)
    }

    fn attach(&mut self, roots: &mut Vec<NodeId>, open: &[NodeId], node: NodeId) {
        match open.last() {
            Some(&parent) => self.append_child(parent, node),
            None => roots.push(node),
        }
    }
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let doc = Document::parse(r#"<li><img src="a.jpg" alt="A"><span>caption</span></li>"#)
            .unwrap();
        let img = doc.elements_by_tag(doc.body(), "img")[0];
        assert!(doc.children(img).is_empty());
        let span = doc.elements_by_tag(doc.body(), "span")[0];
        assert_eq!(doc.tag(doc.parent(span).unwrap()), Some("li"));
    }

    #[test]
    fn self_closing_void_elements_are_accepted() {
        let doc = Document::parse(r#"<p><img src="a.jpg"/><br/>text</p>"#).unwrap();
        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.children(p).len(), 3);
    }

    #[test]
    fn transparent_document_tags() {
        let doc = Document::parse(
            "<!DOCTYPE html><html><head><title>T</title></head><body><div id=\"app\"></div></body></html>",
        )
        .unwrap();
        let top: Vec<&str> = doc
            .element_children(doc.body())
            .filter_map(|n| doc.tag(n))
            .collect();
        assert_eq!(top, vec!["title", "div"]);
    }

    #[test]
    fn mismatched_end_tag_closes_nearest_match() {
        let doc = Document::parse("<div><p>one<span>two</p><p>three</p></div>").unwrap();
        let div = doc.elements_by_tag(doc.body(), "div")[0];
        let ps: Vec<_> = doc.element_children(div).collect();
        assert_eq!(ps.len(), 2);
        assert_eq!(doc.text_content(ps[1]), "three");
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        let doc = Document::parse("<div>a</section>b</div>").unwrap();
        let div = doc.elements_by_tag(doc.body(), "div")[0];
        assert_eq!(doc.text_content(div), "ab");
    }

    #[test]
    fn comments_are_dropped() {
        let doc = Document::parse("<div><!-- images go here --></div>").unwrap();
        let div = doc.elements_by_tag(doc.body(), "div")[0];
        assert!(doc.children(div).is_empty());
    }

    #[test]
    fn entities_are_unescaped() {
        let doc =
            Document::parse(r#"<p title="Tom &amp; Jerry">a&nbsp;b &lt;c&gt; &rsaquo;</p>"#).unwrap();
        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.attr(p, "title"), Some("Tom & Jerry"));
        assert_eq!(doc.text_content(p), "a\u{a0}b <c> ›");
    }

    #[test]
    fn html_style_attributes() {
        let doc = Document::parse("<input type=checkbox checked>").unwrap();
        let input = doc.elements_by_tag(doc.body(), "input")[0];
        assert_eq!(doc.attr(input, "type"), Some("checkbox"));
        assert_eq!(doc.attr(input, "checked"), Some(""));
    }

    #[test]
    fn tag_and_attribute_names_are_lowercased() {
        let doc = Document::parse(r#"<IMG SRC="a.jpg" Alt="x">"#).unwrap();
        let img = doc.elements_by_tag(doc.body(), "img")[0];
        assert_eq!(doc.attr(img, "src"), Some("a.jpg"));
        assert_eq!(doc.attr(img, "alt"), Some("x"));
    }

    #[test]
    fn bare_ampersand_in_url_is_kept() {
        let doc = Document::parse(
            r#"<a href="/p.jpg?w=1500&h=1000"><img src="/t.jpg?w=300&h=200"></a>"#,
        )
        .unwrap();
        let a = doc.elements_by_tag(doc.body(), "a")[0];
        let img = doc.elements_by_tag(doc.body(), "img")[0];
        assert_eq!(doc.attr(a, "href"), Some("/p.jpg?w=1500&h=1000"));
        assert_eq!(doc.attr(img, "src"), Some("/t.jpg?w=300&h=200"));
    }

    #[test]
    fn html5_named_entities_resolve() {
        let doc = Document::parse(
            r#"<img src="a.jpg" alt="Caf&eacute; &rarr; terrace"><p>Caf&eacute; &rarr; terrace</p>"#,
        )
        .unwrap();
        let img = doc.elements_by_tag(doc.body(), "img")[0];
        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.attr(img, "alt"), Some("Café → terrace"));
        assert_eq!(doc.text_content(p), "Café → terrace");
    }

    #[test]
    fn numeric_references_resolve() {
        let doc = Document::parse("<p>&#233;&#x2192;&#X41;</p>").unwrap();
        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.text_content(p), "é→A");
    }

    #[test]
    fn unknown_references_stay_literal() {
        let doc = Document::parse("<p>&bogus; Fish & Chips &#xZZ; &#0; &;</p>").unwrap();
        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.text_content(p), "&bogus; Fish & Chips &#xZZ; &#0; &;");
    }

    #[test]
    fn ampersand_before_distant_semicolon_is_literal() {
        let doc = Document::parse(r#"<a href="/x?a=1&b=2;c=3">x</a>"#).unwrap();
        let a = doc.elements_by_tag(doc.body(), "a")[0];
        assert_eq!(doc.attr(a, "href"), Some("/x?a=1&b=2;c=3"));
    }

    #[test]
    fn parse_fragment_returns_detached_roots() {
        let mut doc = Document::new();
        let roots = doc.parse_fragment("<li>a</li><li>b</li>").unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|&n| !doc.is_attached(n)));
    }
}
