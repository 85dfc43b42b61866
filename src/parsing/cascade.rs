//! Ordered fallback parsing.
//!
//! A filing arrives as whatever the filer's software produced: clean XML, XML wrapped
//! in an SGML submission envelope, XML with stray ampersands, an HTML rendering, or
//! plain text. [`ParseCascade::run`] tries a fixed list of strategies in order:
//!
//! ```text
//! strict XML ─▶ XML from prolog ─▶ root fragment ─▶ sanitized fragment
//!      ─▶ HTML table ─▶ loose <tag>value</tag> pairs ─▶ labeled plain text
//! ```
//!
//! Each strategy is a plain function that either yields a [`ParsedStructure`] or a
//! diagnostic string. The first structure that the form's [`FormSchema`] accepts wins;
//! if none does, the diagnostic of the last attempted stage is returned.

use std::fmt;

use super::html::{strip_html, truncate_chars, unescape_entities};
use super::utils::{
    LABEL_WINDOW, find_amount, find_date, normalize_tag_key, sanitize_ampersands, windows_after,
};
use super::xml::XmlElement;

/// Diagnostic for a payload that has no usable content at all.
pub const EMPTY_DOCUMENT: &str = "empty or unreadable document";

/// One parsing strategy, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    StrictXml,
    PrologXml,
    RootFragment,
    SanitizedFragment,
    HtmlTable,
    LooseTags,
    LabeledText,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[
        Stage::StrictXml,
        Stage::PrologXml,
        Stage::RootFragment,
        Stage::SanitizedFragment,
        Stage::HtmlTable,
        Stage::LooseTags,
        Stage::LabeledText,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::StrictXml => "strict xml",
            Stage::PrologXml => "xml from prolog",
            Stage::RootFragment => "root fragment",
            Stage::SanitizedFragment => "sanitized fragment",
            Stage::HtmlTable => "html table",
            Stage::LooseTags => "loose tags",
            Stage::LabeledText => "labeled text",
        };
        f.write_str(name)
    }
}

/// Plain text with the labeled values found in it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledText {
    pub text: String,
    /// `(field name, raw value)` in the order of the form's field list.
    pub fields: Vec<(String, String)>,
}

impl LabeledText {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Output of one successful strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedStructure {
    Xml(XmlElement),
    /// Table rows after the form's header, each a list of plain-text cells.
    Table(Vec<Vec<String>>),
    /// `(tag, value)` pairs in document order.
    TagValues(Vec<(String, String)>),
    Text(LabeledText),
}

/// A table located by a header string unique to the form's layout.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub header: &'static str,
    pub min_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Date,
}

/// A value looked up by label in plain text.
#[derive(Debug, Clone, Copy)]
pub struct TextField {
    pub name: &'static str,
    /// Tried in order; the first label with a match in its window wins.
    pub labels: &'static [&'static str],
    pub kind: FieldKind,
}

/// What a form family needs from the cascade.
pub trait FormSchema: Sync {
    /// Name used in diagnostics.
    fn form_label(&self) -> &'static str;

    fn stages(&self) -> &'static [Stage] {
        Stage::ALL
    }

    /// Root element names used to cut an XML fragment out of a wrapped payload.
    fn root_tags(&self) -> &'static [&'static str] {
        &[]
    }

    fn table(&self) -> Option<TableSpec> {
        None
    }

    /// Substrings of normalized tag names kept by the loose stage.
    fn loose_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Marker after which the loose stage stops scanning.
    fn loose_cutoff(&self) -> Option<&'static str> {
        None
    }

    fn text_fields(&self) -> &'static [TextField] {
        &[]
    }

    /// Whether plain text is capped at the configured character budget.
    fn caps_text(&self) -> bool {
        true
    }

    /// Whether a structure carries at least one field the interpreter needs.
    fn accepts(&self, structure: &ParsedStructure) -> bool;
}

/// The accepted structure plus the normalized plain text of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutput {
    pub structure: ParsedStructure,
    pub stage: Stage,
    pub text: String,
}

struct StageInput<'a> {
    payload: &'a str,
    text: &'a str,
    schema: &'a dyn FormSchema,
}

type Strategy = fn(&StageInput<'_>) -> Result<ParsedStructure, String>;

const STRATEGIES: &[(Stage, Strategy)] = &[
    (Stage::StrictXml, strict_xml),
    (Stage::PrologXml, prolog_xml),
    (Stage::RootFragment, root_fragment),
    (Stage::SanitizedFragment, sanitized_fragment),
    (Stage::HtmlTable, html_table),
    (Stage::LooseTags, loose_tags),
    (Stage::LabeledText, labeled_text),
];

pub struct ParseCascade;

impl ParseCascade {
    /// Runs the strategies the schema enables, in order, until one is accepted.
    ///
    /// Never panics on malformed input; every failure ends in `Err` with the
    /// diagnostic of the last attempted stage.
    pub fn run(
        payload: &str,
        schema: &dyn FormSchema,
        max_text_chars: usize,
    ) -> Result<CascadeOutput, String> {
        if payload.trim().is_empty() {
            return Err(EMPTY_DOCUMENT.to_string());
        }
        let stripped = strip_html(payload);
        let text = if schema.caps_text() {
            truncate_chars(&stripped, max_text_chars).to_string()
        } else {
            stripped
        };

        let input = StageInput {
            payload,
            text: &text,
            schema,
        };
        let mut diagnostic = EMPTY_DOCUMENT.to_string();

        for (stage, strategy) in STRATEGIES
            .iter()
            .filter(|(stage, _)| schema.stages().contains(stage))
        {
            match strategy(&input) {
                Ok(structure) if schema.accepts(&structure) => {
                    tracing::debug!("{} parsed at stage '{}'", schema.form_label(), stage);
                    return Ok(CascadeOutput {
                        structure,
                        stage: *stage,
                        text: input.text.to_string(),
                    });
                }
                Ok(_) => {
                    diagnostic = format!(
                        "insufficient data: {} stage found no {} fields",
                        stage,
                        schema.form_label()
                    );
                }
                Err(reason) => diagnostic = reason,
            }
            tracing::debug!("{} stage '{}' failed: {}", schema.form_label(), stage, diagnostic);
        }

        Err(diagnostic)
    }
}

fn strict_xml(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    XmlElement::parse(input.payload)
        .map(ParsedStructure::Xml)
        .map_err(|e| format!("XML parse failed: {}", e))
}

fn prolog_xml(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    let start = input
        .payload
        .find("<?xml")
        .ok_or_else(|| "XML parse failed: no XML prolog".to_string())?;
    XmlElement::parse(&input.payload[start..])
        .map(ParsedStructure::Xml)
        .map_err(|e| format!("XML parse failed: {}", e))
}

/// The first `<tag ...>...</tag>` span for each candidate root tag, in candidate order.
fn fragments<'a>(payload: &'a str, tags: &[&str]) -> Vec<&'a str> {
    tags.iter()
        .filter_map(|tag| {
            let pattern = format!(r"(?is)<{0}\b[^>]*>.*?</{0}>", regex::escape(tag));
            let re = regex::Regex::new(&pattern).ok()?;
            re.find(payload).map(|m| m.as_str())
        })
        .collect()
}

fn parse_fragments<'a>(
    candidates: impl Iterator<Item = std::borrow::Cow<'a, str>>,
) -> Result<ParsedStructure, String> {
    let mut last = "XML parse failed: no root fragment found".to_string();
    for candidate in candidates {
        match XmlElement::parse(&candidate) {
            Ok(tree) => return Ok(ParsedStructure::Xml(tree)),
            Err(e) => last = format!("XML parse failed: {}", e),
        }
    }
    Err(last)
}

fn root_fragment(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    parse_fragments(
        fragments(input.payload, input.schema.root_tags())
            .into_iter()
            .map(std::borrow::Cow::Borrowed),
    )
}

fn sanitized_fragment(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    parse_fragments(
        fragments(input.payload, input.schema.root_tags())
            .into_iter()
            .map(|fragment| std::borrow::Cow::Owned(sanitize_ampersands(fragment))),
    )
}

fn html_table(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    let spec = input
        .schema
        .table()
        .ok_or_else(|| "no table layout for this form".to_string())?;

    let lowered = input.payload.to_ascii_lowercase();
    let start = lowered
        .find(&spec.header.to_ascii_lowercase())
        .ok_or_else(|| format!("table header '{}' not found", spec.header))?;
    let end = lowered[start..]
        .find("</table>")
        .map(|offset| start + offset)
        .unwrap_or(input.payload.len());
    let section = &input.payload[start..end];

    let (Some(row_re), Some(cell_re)) = (
        cached_regex!(r"(?is)<tr\b[^>]*>(.*?)</tr>"),
        cached_regex!(r"(?is)<td\b[^>]*>(.*?)</td>"),
    ) else {
        return Err("table patterns unavailable".to_string());
    };

    let rows: Vec<Vec<String>> = row_re
        .captures_iter(section)
        .filter_map(|row| row.get(1))
        .map(|row| {
            cell_re
                .captures_iter(row.as_str())
                .filter_map(|cell| cell.get(1))
                .map(|cell| strip_html(cell.as_str()))
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.len() >= spec.min_cells)
        .collect();

    if rows.is_empty() {
        return Err(format!("no table rows after '{}'", spec.header));
    }
    Ok(ParsedStructure::Table(rows))
}

fn loose_tags(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    let keys = input.schema.loose_keys();
    if keys.is_empty() {
        return Err("no loose tag keys for this form".to_string());
    }
    let payload = match input.schema.loose_cutoff() {
        Some(marker) => {
            let lowered = input.payload.to_ascii_lowercase();
            lowered
                .find(&marker.to_ascii_lowercase())
                .map(|idx| &input.payload[..idx])
                .unwrap_or(input.payload)
        }
        None => input.payload,
    };

    let pairs: Vec<(String, String)> = extract_tag_pairs(payload)
        .into_iter()
        .filter(|(tag, _)| {
            let key = normalize_tag_key(tag);
            keys.iter().any(|k| key.contains(k))
        })
        .collect();

    if pairs.is_empty() {
        return Err("insufficient data: no matching tag/value pairs".to_string());
    }
    Ok(ParsedStructure::TagValues(pairs))
}

/// Every `<tag>value</tag>` pair whose opening and closing names agree.
///
/// A `<value>` element takes the name of the nearest enclosing open tag, so
/// `<transactionShares><value>100</value>` yields `("transactionShares", "100")`.
pub fn extract_tag_pairs(payload: &str) -> Vec<(String, String)> {
    let (Some(pair_re), Some(open_re)) = (
        cached_regex!(
            r"<(?:\w+:)?([A-Za-z0-9_\-]+)\b[^>]*>([^<]+)</(?:\w+:)?([A-Za-z0-9_\-]+)>"
        ),
        cached_regex!(r"<(?:\w+:)?([A-Za-z][A-Za-z0-9_\-]*)\b[^>]*>"),
    ) else {
        return Vec::new();
    };

    // Open, non self-closing tags with their byte offsets.
    let opens: Vec<(usize, &str)> = open_re
        .captures_iter(payload)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if whole.as_str().ends_with("/>") {
                return None;
            }
            Some((whole.start(), caps.get(1)?.as_str()))
        })
        .collect();

    pair_re
        .captures_iter(payload)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let open = caps.get(1)?.as_str();
            let close = caps.get(3)?.as_str();
            if !open.eq_ignore_ascii_case(close) {
                return None;
            }
            let value = unescape_entities(caps.get(2)?.as_str().trim());
            if value.is_empty() {
                return None;
            }
            let tag = if open.eq_ignore_ascii_case("value") {
                let before = opens.partition_point(|(pos, _)| *pos < whole.start());
                opens[..before]
                    .iter()
                    .rev()
                    .map(|(_, name)| *name)
                    .find(|name| !name.eq_ignore_ascii_case("value"))
                    .unwrap_or(open)
            } else {
                open
            };
            Some((tag.to_string(), value))
        })
        .collect()
}

fn labeled_text(input: &StageInput<'_>) -> Result<ParsedStructure, String> {
    if input.text.trim().is_empty() {
        return Err(EMPTY_DOCUMENT.to_string());
    }
    let field_specs = input.schema.text_fields();
    let fields: Vec<(String, String)> = field_specs
        .iter()
        .filter_map(|field| {
            find_labeled_value(input.text, field).map(|value| (field.name.to_string(), value))
        })
        .collect();

    if !field_specs.is_empty() && fields.is_empty() {
        return Err(format!(
            "insufficient data: no labeled {} fields in text",
            input.schema.form_label()
        ));
    }
    Ok(ParsedStructure::Text(LabeledText {
        text: input.text.to_string(),
        fields,
    }))
}

/// Scans the window after every occurrence of every label for a value of the field's kind.
pub fn find_labeled_value(text: &str, field: &TextField) -> Option<String> {
    field.labels.iter().find_map(|label| {
        windows_after(text, label, LABEL_WINDOW)
            .into_iter()
            .find_map(|window| match field.kind {
                FieldKind::Date => find_date(window),
                FieldKind::Number => find_amount(window).map(|v| v.to_string()),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoteSchema;

    impl FormSchema for NoteSchema {
        fn form_label(&self) -> &'static str {
            "note"
        }

        fn root_tags(&self) -> &'static [&'static str] {
            &["note"]
        }

        fn loose_keys(&self) -> &'static [&'static str] {
            &["amount"]
        }

        fn text_fields(&self) -> &'static [TextField] {
            &[TextField {
                name: "amount",
                labels: &["Amount"],
                kind: FieldKind::Number,
            }]
        }

        fn accepts(&self, structure: &ParsedStructure) -> bool {
            match structure {
                ParsedStructure::Xml(root) => root.first_text(&["amount"]).is_some(),
                ParsedStructure::TagValues(pairs) => !pairs.is_empty(),
                ParsedStructure::Text(text) => text.field("amount").is_some(),
                ParsedStructure::Table(_) => false,
            }
        }
    }

    fn stage_of(payload: &str) -> Result<Stage, String> {
        ParseCascade::run(payload, &NoteSchema, 6000).map(|out| out.stage)
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(stage_of("<note><amount>5</amount></note>"), Ok(Stage::StrictXml));
        assert_eq!(
            stage_of("junk <?xml version=\"1.0\"?><note><amount>5</amount></note>"),
            Ok(Stage::PrologXml)
        );
        assert_eq!(
            stage_of("<SEC-DOCUMENT><TYPE>X<note><amount>5</amount></note></SEC-DOCUMENT>"),
            Ok(Stage::RootFragment)
        );
        assert_eq!(
            stage_of("<DOC><note><by>A&B</by><amount>5</amount></note>"),
            Ok(Stage::SanitizedFragment)
        );
        assert_eq!(
            stage_of("<DOC><note><amount>5</amount>"),
            Ok(Stage::LooseTags)
        );
        assert_eq!(stage_of("Amount due: $1,250.00 today"), Ok(Stage::LabeledText));
    }

    #[test]
    fn test_terminal_diagnostics() {
        assert_eq!(stage_of("   "), Err(EMPTY_DOCUMENT.to_string()));
        let err = stage_of("<p>nothing to see</p>").unwrap_err();
        assert!(err.starts_with("insufficient data"), "{}", err);
    }

    #[test]
    fn test_deep_nesting_falls_through() {
        let payload = format!("{}{}", "<note>".repeat(200_000), "</note>".repeat(200_000));
        assert!(!matches!(stage_of(&payload), Ok(Stage::StrictXml)));
    }

    #[test]
    fn test_labeled_value_window() {
        let field = TextField {
            name: "value",
            labels: &["Market Value", "Value"],
            kind: FieldKind::Number,
        };
        assert_eq!(
            find_labeled_value("Aggregate Market Value $412,500 next", &field),
            Some("412500".to_string())
        );
        assert_eq!(find_labeled_value("Market Value unknown", &field), None);
    }

    #[test]
    fn test_extract_tag_pairs_value_wrappers() {
        let payload = r#"<transactionShares><footnoteId id="F1"/><value>100</value></transactionShares>
            <transactionCode>S</transactionCode><a>x</b>"#;
        let pairs = extract_tag_pairs(payload);
        assert_eq!(
            pairs,
            vec![
                ("transactionShares".to_string(), "100".to_string()),
                ("transactionCode".to_string(), "S".to_string()),
            ]
        );
    }
}
