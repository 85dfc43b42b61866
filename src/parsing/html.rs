//! Markup normalizer: turns HTML, XML or SGML-wrapped filings into one line of plain text.

use quick_xml::escape::{resolve_html5_entity, unescape_with};

use super::utils::sanitize_ampersands;

/// Removes `<script>`, `<style>` and `<head>` blocks and every remaining tag, unescapes
/// entities, and collapses whitespace runs into single spaces.
///
/// ```rust
/// use edgarlens::parsing::html::strip_html;
///
/// let html = "<html><head><title>x</title></head><body><p>Item&nbsp;2.02</p>\n<p>AT&amp;T</p></body></html>";
/// assert_eq!(strip_html(html), "Item 2.02 AT&T");
/// ```
pub fn strip_html(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut cleaned = raw.to_string();
    let blocks = [
        cached_regex!(r"(?is)<script.*?>.*?</script>"),
        cached_regex!(r"(?is)<style.*?>.*?</style>"),
        cached_regex!(r"(?is)<head.*?>.*?</head>"),
        cached_regex!(r"(?s)<[^>]+>"),
    ];
    for re in blocks.into_iter().flatten() {
        cleaned = re.replace_all(&cleaned, " ").into_owned();
    }
    unescape_entities(&cleaned)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unescapes HTML5 named entities and numeric references. Bare ampersands are kept
/// as-is; text with an unknown entity is returned unchanged.
pub fn unescape_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let sanitized = sanitize_ampersands(text);
    match unescape_with(&sanitized, resolve_html5_entity) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Cuts `text` to at most `budget` characters.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
