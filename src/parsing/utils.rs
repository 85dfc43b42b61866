use regex::Regex;
use std::sync::OnceLock;

/// Characters scanned after a label when looking for its value.
pub const LABEL_WINDOW: usize = 240;

pub(crate) fn compile_once(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Invalid pattern {}: {}", pattern, e);
            None
        }
    })
    .as_ref()
}

/// Parses the first number in `value`, ignoring thousands separators and currency signs.
///
/// ```rust
/// use edgarlens::parsing::utils::parse_number;
///
/// assert_eq!(parse_number("$1,250,000.00"), Some(1250000.0));
/// assert_eq!(parse_number("12,500 shares"), Some(12500.0));
/// assert_eq!(parse_number("n/a"), None);
/// ```
pub fn parse_number(value: &str) -> Option<f64> {
    let re = cached_regex!(r"-?\d[\d,]*\.?\d*")?;
    let raw = re.find(value)?.as_str().replace(',', "");
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Finds the first `YYYY-MM-DD` or `M/D/YYYY` date in `text`.
pub fn find_date(text: &str) -> Option<String> {
    let re = cached_regex!(r"\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}")?;
    re.find(text).map(|m| m.as_str().to_string())
}

/// Finds the first amount-looking token in `text`, e.g. `$412,500` or `7,500`.
///
/// Parenthesized references such as `(1)` or `(See instr. 3(c))` are skipped, and a
/// bare number needs at least two digits, so footnote markers are never read as values.
///
/// ```rust
/// use edgarlens::parsing::utils::find_amount;
///
/// assert_eq!(find_amount(" (See instr. 3(c)) 7,500 units"), Some(7500.0));
/// assert_eq!(find_amount(" (2) $15.00"), Some(15.0));
/// assert_eq!(find_amount(" 3 of 4"), None);
/// ```
pub fn find_amount(text: &str) -> Option<f64> {
    let references = cached_regex!(r"\((?:[^()]|\([^()]*\))*\)")?;
    let re = cached_regex!(r"\$\s*\d[\d,]*(?:\.\d+)?|\d[\d,.]*\d")?;
    let cleaned = references.replace_all(text, " ");
    re.find(&cleaned).and_then(|m| parse_number(m.as_str()))
}

/// Returns the text following each case-insensitive occurrence of `label`, up to `window` chars.
pub fn windows_after<'a>(text: &'a str, label: &str, window: usize) -> Vec<&'a str> {
    if label.is_empty() {
        return Vec::new();
    }
    let haystack = text.to_ascii_lowercase();
    let needle = label.to_ascii_lowercase();

    haystack
        .match_indices(&needle)
        .map(|(idx, _)| {
            let rest = &text[idx + needle.len()..];
            let end = rest
                .char_indices()
                .nth(window)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            &rest[..end]
        })
        .collect()
}

/// Escapes every `&` that does not start an entity or character reference.
pub fn sanitize_ampersands(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    let mut rest = payload;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if starts_with_reference(tail) {
            out.push('&');
        } else {
            out.push_str("&amp;");
        }
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// `&name;`, `&#123;` or `&#x1F;` at the start of `tail`.
fn starts_with_reference(tail: &str) -> bool {
    let body = &tail[1..];
    let Some(end) = body.find(';') else {
        return false;
    };
    let name = &body[..end];
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = name.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
    }
}

/// Lower-cases a tag name and drops everything but ASCII letters and digits.
pub fn normalize_tag_key(tag: &str) -> String {
    tag.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("130.50"), Some(130.5));
        assert_eq!(parse_number("-1,000"), Some(-1000.0));
        assert_eq!(parse_number("1,000."), Some(1000.0));
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_find_amount_skips_references() {
        assert_eq!(
            find_amount(" (See instr. 3(c)) 7,500 Aggregate Market Value"),
            Some(7500.0)
        );
        assert_eq!(find_amount(" (1) 2,000 Price per Share (2) $15.00"), Some(2000.0));
        assert_eq!(find_amount(" $5 each"), Some(5.0));
        assert_eq!(find_amount(" 1,000.50 total"), Some(1000.5));
        assert_eq!(find_amount(" see note 3"), None);
    }

    #[test]
    fn test_find_date() {
        assert_eq!(find_date("sale on 06/03/2024 via broker"), Some("06/03/2024".into()));
        assert_eq!(find_date("2024-05-01"), Some("2024-05-01".into()));
        assert_eq!(find_date("no date"), None);
    }

    #[test]
    fn test_windows_after() {
        let text = "Shares: 100 and later shares: 250";
        let windows = windows_after(text, "SHARES:", 5);
        assert_eq!(windows, vec![" 100 ", " 250"]);
    }

    #[test]
    fn test_windows_after_respects_char_boundaries() {
        let text = "Price: €12 €13";
        let windows = windows_after(text, "price:", 3);
        assert_eq!(windows, vec![" €1"]);
    }

    #[test]
    fn test_sanitize_ampersands() {
        assert_eq!(sanitize_ampersands("AT&T"), "AT&amp;T");
        assert_eq!(sanitize_ampersands("a &amp; b"), "a &amp; b");
        assert_eq!(sanitize_ampersands("&#38; &#x26; & end&"), "&#38; &#x26; &amp; end&amp;");
    }

    #[test]
    fn test_normalize_tag_key() {
        assert_eq!(normalize_tag_key("ns1:No_Of-Units"), "ns1noofunits");
        assert_eq!(normalize_tag_key("aggregateMarketValue"), "aggregatemarketvalue");
    }
}
