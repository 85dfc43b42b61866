//! Form 144, notice of proposed sale of securities.

use super::{FormFindings, FormInterpreter, insufficient};
use crate::error::Result;
use crate::model::{Dilutive, Impact, InsiderAction};
use crate::parsing::cached_regex;
use crate::parsing::cascade::{
    CascadeOutput, FieldKind, FormSchema, LabeledText, ParsedStructure, TableSpec, TextField,
};
use crate::parsing::utils::{find_date, normalize_tag_key, parse_number};
use crate::parsing::xml::XmlElement;

const SELLER_TAGS: &[&str] = &[
    "nameofpersonforwhoseaccountthesecuritiesaretobesold",
    "personname",
    "ownername",
    "reportingownername",
];
const ROLE_TAGS: &[&str] = &[
    "relationshiptoissuer",
    "relationshipofpersontoissuer",
    "relationship",
    "officertitle",
];
const SHARES_TAGS: &[&str] = &[
    "noofunitssold",
    "numberofshares",
    "numberofsharesproposedtobesold",
    "amountofsecuritiestobesold",
    "aggregateamountofsecuritiestobesold",
];
const VALUE_TAGS: &[&str] = &[
    "aggregatemarketvalue",
    "approximatemarketvalue",
    "aggregatesalesprice",
    "valueofsecurities",
];
const DATE_TAGS: &[&str] = &[
    "approxsaledate",
    "estimateddateofsale",
    "dateofsale",
    "approximatesaledate",
];

const LOOSE_SELLER: &[&str] = &["personforwhoseaccount", "ownername", "personname", "reportingowner"];
const LOOSE_ROLE: &[&str] = &["relationshiptoissuer", "officertitle", "relationship"];
const LOOSE_SHARES: &[&str] = &["noofunitssold", "numberofshares", "amountofsecurities", "aggregatesecurities"];
const LOOSE_VALUE: &[&str] = &["aggregatemarketvalue", "salesprice", "valueofsecurities"];
const LOOSE_DATE: &[&str] = &["approxsaledate", "estimateddateofsale", "dateofsale", "saledate"];

const SHARES_CELL: usize = 2;
const VALUE_CELL: usize = 3;
const DATE_CELL: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProposedSaleForm;

/// Fields recovered from any structure, before they become findings.
#[derive(Debug, Default, PartialEq)]
struct ProposedSale {
    seller: Option<String>,
    role: Option<String>,
    shares: Option<f64>,
    value: Option<f64>,
    date: Option<String>,
}

impl ProposedSale {
    fn is_empty(&self) -> bool {
        self.seller.is_none() && self.shares.is_none() && self.value.is_none() && self.date.is_none()
    }
}

impl FormSchema for ProposedSaleForm {
    fn form_label(&self) -> &'static str {
        "Form 144"
    }

    fn root_tags(&self) -> &'static [&'static str] {
        &["form144", "edgarSubmission", "document"]
    }

    fn table(&self) -> Option<TableSpec> {
        Some(TableSpec {
            header: "Number of Shares or Other Units To Be Sold",
            min_cells: 6,
        })
    }

    fn loose_keys(&self) -> &'static [&'static str] {
        &[
            "personforwhoseaccount",
            "ownername",
            "personname",
            "reportingowner",
            "relationshiptoissuer",
            "officertitle",
            "relationship",
            "noofunitssold",
            "numberofshares",
            "amountofsecurities",
            "aggregatesecurities",
            "aggregatemarketvalue",
            "salesprice",
            "valueofsecurities",
            "approxsaledate",
            "estimateddateofsale",
            "dateofsale",
            "saledate",
        ]
    }

    fn text_fields(&self) -> &'static [TextField] {
        &[
            TextField {
                name: "shares",
                labels: &[
                    "Number of Shares or Other Units To Be Sold",
                    "Number of Shares",
                    "Number of Securities",
                    "Aggregate Amount of Securities",
                    "Amount of Securities",
                ],
                kind: FieldKind::Number,
            },
            TextField {
                name: "value",
                labels: &[
                    "Aggregate Market Value",
                    "Approximate Market Value",
                    "Aggregate Sales Price",
                    "Value of Securities",
                ],
                kind: FieldKind::Number,
            },
            TextField {
                name: "date",
                labels: &["Approximate Date of Sale", "Date of Sale"],
                kind: FieldKind::Date,
            },
        ]
    }

    fn caps_text(&self) -> bool {
        false
    }

    fn accepts(&self, structure: &ParsedStructure) -> bool {
        match structure {
            ParsedStructure::Xml(root) => !from_xml(root).is_empty(),
            ParsedStructure::Table(rows) => {
                let sale = from_table(rows);
                sale.shares.is_some() || sale.value.is_some()
            }
            ParsedStructure::TagValues(pairs) => !from_pairs(pairs).is_empty(),
            ParsedStructure::Text(text) => !text.fields.is_empty(),
        }
    }
}

impl FormInterpreter for ProposedSaleForm {
    fn interpret(&self, output: &CascadeOutput) -> Result<FormFindings> {
        let mut sale = match &output.structure {
            ParsedStructure::Xml(root) => from_xml(root),
            ParsedStructure::Table(rows) => from_table(rows),
            ParsedStructure::TagValues(pairs) => from_pairs(pairs),
            ParsedStructure::Text(labeled) => from_text(labeled),
        };
        if sale.is_empty() {
            return Err(insufficient("no seller, shares, value or date in Form 144"));
        }
        if sale.seller.is_none() {
            sale.seller = text_seller(&output.text);
        }
        if sale.role.is_none() {
            sale.role = text_role(&output.text);
        }

        let mut findings =
            FormFindings::new("insider proposed sale", Impact::Medium, Dilutive::False);
        findings.insider_action = Some(InsiderAction::Sell);
        findings.insider_name = sale.seller;
        findings.insider_role = sale.role;
        findings.shares = sale.shares;
        findings.value_usd = sale.value;
        findings.price = match (sale.shares, sale.value) {
            (Some(shares), Some(value)) if shares > 0.0 => Some(value / shares),
            _ => None,
        };
        findings.sale_date = sale.date;
        Ok(findings)
    }
}

fn from_xml(root: &XmlElement) -> ProposedSale {
    ProposedSale {
        seller: root.first_text(SELLER_TAGS),
        role: root.first_text(ROLE_TAGS),
        shares: root.first_text(SHARES_TAGS).and_then(|v| parse_number(&v)),
        value: root.first_text(VALUE_TAGS).and_then(|v| parse_number(&v)),
        date: root.first_text(DATE_TAGS),
    }
}

/// A number only if the cell starts with one; header cells like "(See instr. 3(c))"
/// would otherwise parse.
fn leading_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim().trim_start_matches('$').trim_start();
    if !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    parse_number(trimmed)
}

/// Sums shares and value across rows and keeps the first non-empty date.
fn from_table(rows: &[Vec<String>]) -> ProposedSale {
    let mut sale = ProposedSale::default();
    for cells in rows {
        let shares = cells.get(SHARES_CELL).and_then(|c| leading_number(c));
        let value = cells.get(VALUE_CELL).and_then(|c| leading_number(c));
        if shares.is_none() && value.is_none() {
            continue;
        }
        if let Some(shares) = shares {
            sale.shares = Some(sale.shares.unwrap_or(0.0) + shares);
        }
        if let Some(value) = value {
            sale.value = Some(sale.value.unwrap_or(0.0) + value);
        }
        if sale.date.is_none() {
            sale.date = cells
                .get(DATE_CELL)
                .and_then(|c| find_date(c).or_else(|| Some(c.trim().to_string())))
                .filter(|d| !d.is_empty());
        }
    }
    sale
}

fn from_pairs(pairs: &[(String, String)]) -> ProposedSale {
    let first = |keys: &[&str]| {
        pairs.iter().find_map(|(tag, value)| {
            let key = normalize_tag_key(tag);
            keys.iter().any(|k| key.contains(k)).then(|| value.clone())
        })
    };
    ProposedSale {
        seller: first(LOOSE_SELLER),
        role: first(LOOSE_ROLE),
        shares: first(LOOSE_SHARES).and_then(|v| parse_number(&v)),
        value: first(LOOSE_VALUE).and_then(|v| parse_number(&v)),
        date: first(LOOSE_DATE),
    }
}

fn from_text(labeled: &LabeledText) -> ProposedSale {
    ProposedSale {
        seller: text_seller(&labeled.text),
        role: text_role(&labeled.text),
        shares: labeled.field("shares").and_then(parse_number),
        value: labeled.field("value").and_then(parse_number),
        date: labeled.field("date").map(str::to_string),
    }
}

fn capture(text: &str, re: Option<&regex::Regex>) -> Option<String> {
    re?.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches([',', ';', '.']).trim().to_string())
        .filter(|value| !value.is_empty() && value.chars().count() <= 120)
}

fn text_seller(text: &str) -> Option<String> {
    capture(
        text,
        cached_regex!(
            r"(?i)Person for Whose Account the Securities are to be Sold\s*[:\-]?\s*(.+?)\s*(?:\(\w\)\s*)?(?:Relationship to (?:the )?Issuer|Name of Issuer|Title of the|CUSIP|$)"
        ),
    )
}

fn text_role(text: &str) -> Option<String> {
    capture(
        text,
        cached_regex!(
            r"(?i)Relationship (?:of Person )?to (?:the )?Issuer\s*[:\-]?\s*(.+?)\s*(?:\(\w\)\s*)?(?:144:|Securities Information|Title of the|$)"
        ),
    )
}
