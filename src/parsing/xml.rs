//! A small, strict XML element tree.
//!
//! Filings are matched on local element names only, so namespaces are dropped and
//! attributes are ignored. Parsing is strict: mismatched end tags, unclosed elements,
//! text outside the root and undefined entities (including bare `&`) are all errors,
//! so the cascade can fall through to a more forgiving stage.

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Deepest element nesting accepted before a document is rejected.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Local name without namespace prefix.
    pub name: String,
    /// Concatenated direct text content, trimmed.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn named(raw: &[u8]) -> Self {
        XmlElement {
            name: String::from_utf8_lossy(raw).into_owned(),
            ..Default::default()
        }
    }

    fn push_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    /// Parses a complete document with exactly one root element.
    pub fn parse(content: &str) -> Result<XmlElement, String> {
        let mut reader = Reader::from_str(content);
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = true;

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if root.is_some() {
                        return Err(format!(
                            "content after root element at position {}",
                            reader.buffer_position()
                        ));
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(format!(
                            "elements nested deeper than {} at position {}",
                            MAX_DEPTH,
                            reader.buffer_position()
                        ));
                    }
                    stack.push(XmlElement::named(e.local_name().as_ref()));
                }
                Ok(Event::Empty(e)) => {
                    let element = XmlElement::named(e.local_name().as_ref());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => return Err("multiple root elements".to_string()),
                    }
                }
                Ok(Event::End(e)) => {
                    let Some(element) = stack.pop() else {
                        return Err("unexpected closing tag".to_string());
                    };
                    let closing = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if closing != element.name {
                        return Err(format!(
                            "expected </{}>, found </{}>",
                            element.name, closing
                        ));
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape_with(resolve_html5_entity)
                        .map_err(|err| format!("invalid text content: {}", err))?;
                    match stack.last_mut() {
                        Some(current) => current.push_text(&text),
                        None if text.trim().is_empty() => {}
                        None => return Err("text outside of root element".to_string()),
                    }
                }
                Ok(Event::CData(e)) => {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    match stack.last_mut() {
                        Some(current) => current.push_text(&text),
                        None => return Err("CDATA outside of root element".to_string()),
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!(
                        "error at position {}: {}",
                        reader.buffer_position(),
                        e
                    ));
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(format!("unclosed element <{}>", open.name));
        }
        root.ok_or_else(|| "no root element".to_string())
    }

    /// This element and all of its descendants, depth first.
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut ordered = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            ordered.push(node);
            pending.extend(node.children.iter().rev());
        }
        ordered
    }

    /// Every element (this one included) whose local name matches `name`, case-insensitively.
    pub fn find_all(&self, name: &str) -> Vec<&XmlElement> {
        self.descendants()
            .into_iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .collect()
    }

    /// The text of the first element named after the first candidate that has one.
    ///
    /// Candidates are tried in order, so earlier names win over later ones even if they
    /// appear later in the document.
    pub fn first_text(&self, candidates: &[&str]) -> Option<String> {
        let nodes = self.descendants();
        candidates.iter().find_map(|candidate| {
            nodes
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(candidate) && !e.text.is_empty())
                .map(|e| e.text.clone())
        })
    }

    /// The first non-empty `<value>` inside an element named `parent_tag`.
    ///
    /// SEC ownership documents wrap most figures this way:
    /// `<transactionShares><value>100</value></transactionShares>`.
    pub fn value_in(&self, parent_tag: &str) -> Option<String> {
        self.find_all(parent_tag).into_iter().find_map(|parent| {
            parent
                .find_all("value")
                .into_iter()
                .find(|v| !v.text.is_empty())
                .map(|v| v.text.clone())
        })
    }
}

/// XML boolean flags as used in ownership documents.
pub fn xml_bool(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
        <ns:root xmlns:ns="urn:x">
          <ns:owner><name>Jane</name><isDirector>1</isDirector></ns:owner>
          <txn><shares><value>100</value></shares><empty/></txn>
          <txn><shares><footnoteId id="F1"/><value>40</value></shares></txn>
        </ns:root>"#;

    #[test]
    fn test_parse_tree() {
        let root = XmlElement::parse(DOC).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.find_all("TXN").len(), 2);
        assert_eq!(root.first_text(&["missing", "name"]), Some("Jane".to_string()));
        assert!(xml_bool(root.first_text(&["isdirector"]).as_deref()));
        assert_eq!(root.find_all("txn")[1].value_in("shares"), Some("40".to_string()));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = XmlElement::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = root.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_rejects_deep_nesting() {
        let nested = |depth: usize| format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        let ok = XmlElement::parse(&nested(MAX_DEPTH)).unwrap();
        assert_eq!(ok.descendants().len(), MAX_DEPTH);

        let err = XmlElement::parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(err.contains("nested deeper"), "{}", err);
        assert!(XmlElement::parse(&nested(200_000)).is_err());
    }

    #[test]
    fn test_strictness() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("<a>AT&T</a>").is_err());
        assert!(XmlElement::parse("<a>ok</a><b/>").is_err());
        assert!(XmlElement::parse("<a>unclosed").is_err());
        assert!(XmlElement::parse("just text").is_err());
        assert!(XmlElement::parse("").is_err());
        assert_eq!(XmlElement::parse("<a>AT&amp;T</a>").unwrap().text, "AT&T");
    }
}
