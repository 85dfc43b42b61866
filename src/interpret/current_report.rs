//! Form 8-K, current report.

use super::{FormFindings, FormInterpreter};
use crate::error::Result;
use crate::model::{Dilutive, Impact};
use crate::parsing::cached_regex;
use crate::parsing::cascade::{CascadeOutput, FormSchema, ParsedStructure, Stage};
use crate::parsing::utils::parse_number;

/// Event label for an 8-K item number.
const ITEM_EVENTS: &[(&str, &str)] = &[
    ("1.01", "material agreement"),
    ("1.02", "termination of agreement"),
    ("2.01", "M&A"),
    ("2.02", "results/guidance"),
    ("2.03", "financing"),
    ("2.04", "default/acceleration"),
    ("2.05", "restructuring"),
    ("2.06", "impairment"),
    ("3.02", "equity sale"),
    ("3.03", "rights modification"),
    ("5.02", "officer/director change"),
    ("7.01", "disclosure"),
    ("8.01", "other"),
];

const MATERIAL_ITEMS: &[&str] = &[
    "1.01", "2.01", "2.02", "2.03", "2.04", "2.05", "2.06", "3.02", "3.03", "5.02",
];

const DILUTION_PHRASES: &[&str] = &[
    "equity offering",
    "registered offering",
    "private placement",
    "common stock",
];

/// Event type when no item maps onto a known label.
pub const DEFAULT_EVENT: &str = "corporate event (8-K)";

#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentReportForm;

impl FormSchema for CurrentReportForm {
    fn form_label(&self) -> &'static str {
        "8-K"
    }

    fn stages(&self) -> &'static [Stage] {
        &[Stage::LabeledText]
    }

    fn accepts(&self, structure: &ParsedStructure) -> bool {
        matches!(structure, ParsedStructure::Text(text) if !text.text.trim().is_empty())
    }
}

impl FormInterpreter for CurrentReportForm {
    fn interpret(&self, output: &CascadeOutput) -> Result<FormFindings> {
        let text = &output.text;
        let items = item_numbers(text);
        let material = items.iter().any(|item| MATERIAL_ITEMS.contains(&item.as_str()));
        let event_type = items
            .first()
            .and_then(|first| ITEM_EVENTS.iter().find(|(item, _)| item == first))
            .map(|(_, event)| *event)
            .unwrap_or(DEFAULT_EVENT);

        let lowered = text.to_lowercase();
        let dilutive = items.iter().any(|item| item == "3.02")
            || DILUTION_PHRASES.iter().any(|phrase| lowered.contains(phrase));
        let impact = if material { Impact::High } else { Impact::Medium };

        let mut findings = FormFindings::new(event_type, impact, Dilutive::from(dilutive));
        findings.items = items;
        findings.material = Some(material);
        findings.shares = first_capture(text, cached_regex!(r"(?i)([0-9][0-9,.]+)\s+shares"));
        findings.value_usd = first_capture(text, cached_regex!(r"\$\s*([0-9][0-9,.]+)"));
        Ok(findings)
    }
}

/// Every distinct `Item N.NN` in document order.
pub fn item_numbers(text: &str) -> Vec<String> {
    let Some(re) = cached_regex!(r"(?i)\bItem\s+([0-9]{1,2}\.\d{2})") else {
        return Vec::new();
    };
    let mut items: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        if let Some(item) = caps.get(1).map(|m| m.as_str()) {
            if !items.iter().any(|seen| seen == item) {
                items.push(item.to_string());
            }
        }
    }
    items
}

fn first_capture(text: &str, re: Option<&regex::Regex>) -> Option<f64> {
    re?.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_number(m.as_str()))
        .filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::cascade::ParseCascade;

    fn interpret(payload: &str) -> FormFindings {
        let output = ParseCascade::run(payload, &CurrentReportForm, 6000).unwrap();
        assert_eq!(output.stage, Stage::LabeledText);
        CurrentReportForm.interpret(&output).unwrap()
    }

    #[test]
    fn test_results_release_is_material() {
        let findings = interpret(
            "<html><body><p>Item 2.02 Results of Operations</p><p>Item 7.01 Regulation FD</p>\
             <p>Item 2.02 again</p></body></html>",
        );
        assert_eq!(findings.items, vec!["2.02", "7.01"]);
        assert_eq!(findings.event_type, "results/guidance");
        assert_eq!(findings.material, Some(true));
        assert_eq!(findings.impact, Impact::High);
        assert_eq!(findings.dilutive, Dilutive::False);
    }

    #[test]
    fn test_equity_sale_is_dilutive() {
        let findings = interpret(
            "ITEM 3.02 Unregistered Sales of Equity Securities. The company sold 1,500,000 shares \
             for gross proceeds of $ 12,000,000.",
        );
        assert_eq!(findings.event_type, "equity sale");
        assert_eq!(findings.dilutive, Dilutive::True);
        assert_eq!(findings.shares, Some(1_500_000.0));
        assert_eq!(findings.value_usd, Some(12_000_000.0));
    }

    #[test]
    fn test_unknown_items_fall_back() {
        let findings = interpret("Item 9.01 Financial Statements and Exhibits");
        assert_eq!(findings.event_type, DEFAULT_EVENT);
        assert_eq!(findings.material, Some(false));
        assert_eq!(findings.impact, Impact::Medium);

        let findings = interpret("A press release without item headings mentions common stock.");
        assert!(findings.items.is_empty());
        assert_eq!(findings.event_type, DEFAULT_EVENT);
        assert_eq!(findings.dilutive, Dilutive::True);
    }
}
