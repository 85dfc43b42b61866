//! Form 10-K, annual report. Only item headings are extracted.

use super::{FormFindings, FormInterpreter};
use crate::error::Result;
use crate::model::{Dilutive, Impact};
use crate::parsing::cached_regex;
use crate::parsing::cascade::{CascadeOutput, FormSchema, ParsedStructure, Stage};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnnualReportForm;

impl FormSchema for AnnualReportForm {
    fn form_label(&self) -> &'static str {
        "10-K"
    }

    fn stages(&self) -> &'static [Stage] {
        &[Stage::LabeledText]
    }

    fn accepts(&self, structure: &ParsedStructure) -> bool {
        matches!(structure, ParsedStructure::Text(text) if !text.text.trim().is_empty())
    }
}

impl FormInterpreter for AnnualReportForm {
    fn interpret(&self, output: &CascadeOutput) -> Result<FormFindings> {
        let mut findings = FormFindings::new("annual report", Impact::Medium, Dilutive::False);
        findings.items = item_headings(&output.text);
        Ok(findings)
    }
}

/// Distinct `Item 1`, `Item 1A`, `Item 7` headings, upper-cased, in document order.
pub fn item_headings(text: &str) -> Vec<String> {
    let Some(re) = cached_regex!(r"(?i)\bItem\s+([0-9]{1,2}[A-Z]?)\b") else {
        return Vec::new();
    };
    let mut items: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        let Some(item) = caps.get(1).map(|m| m.as_str().to_uppercase()) else {
            continue;
        };
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items
}
