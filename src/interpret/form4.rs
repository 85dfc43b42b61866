//! Form 4, statement of changes in beneficial ownership.

use super::{FormFindings, FormInterpreter, TransactionRecord, aggregate, insufficient};
use crate::error::Result;
use crate::model::{Dilutive, Impact, InsiderAction};
use crate::parsing::cached_regex;
use crate::parsing::cascade::{
    CascadeOutput, FieldKind, FormSchema, LabeledText, ParsedStructure, TableSpec, TextField,
};
use crate::parsing::utils::{normalize_tag_key, parse_number};
use crate::parsing::xml::{XmlElement, xml_bool};

const CODE_CELL: usize = 3;
const SHARES_CELL: usize = 5;
const ACQUIRED_DISPOSED_CELL: usize = 6;
const PRICE_CELL: usize = 7;

const OWNER_NAME_TAGS: &[&str] = &["rptownername", "reportingownername", "ownername"];

#[derive(Debug, Clone, Copy, Default)]
pub struct InsiderTransactionForm;

impl FormSchema for InsiderTransactionForm {
    fn form_label(&self) -> &'static str {
        "Form 4"
    }

    fn root_tags(&self) -> &'static [&'static str] {
        &["ownershipDocument"]
    }

    fn table(&self) -> Option<TableSpec> {
        Some(TableSpec {
            header: "Table I - Non-Derivative Securities",
            min_cells: 8,
        })
    }

    fn loose_keys(&self) -> &'static [&'static str] {
        &[
            "transactionshares",
            "transactionpricepershare",
            "transactionacquireddisposedcode",
            "transactioncode",
            "rptownername",
        ]
    }

    fn loose_cutoff(&self) -> Option<&'static str> {
        Some("<derivativeTable")
    }

    fn text_fields(&self) -> &'static [TextField] {
        &[
            TextField {
                name: "shares",
                labels: &["Transaction Shares", "Number of Shares", "Amount of Securities", "Shares"],
                kind: FieldKind::Number,
            },
            TextField {
                name: "price",
                labels: &["Transaction Price", "Price per Share", "Price"],
                kind: FieldKind::Number,
            },
        ]
    }

    fn caps_text(&self) -> bool {
        false
    }

    fn accepts(&self, structure: &ParsedStructure) -> bool {
        match structure {
            ParsedStructure::Xml(root) => !root.find_all("ownershipDocument").is_empty(),
            ParsedStructure::Table(rows) => !table_transactions(rows).is_empty(),
            ParsedStructure::TagValues(pairs) => pairs
                .iter()
                .any(|(tag, _)| loose_field(tag) == Some(LooseField::Shares)),
            ParsedStructure::Text(text) => text.field("shares").is_some(),
        }
    }
}

impl FormInterpreter for InsiderTransactionForm {
    fn interpret(&self, output: &CascadeOutput) -> Result<FormFindings> {
        match &output.structure {
            ParsedStructure::Xml(root) => {
                let (name, role) = xml_owner(root);
                from_transactions(&xml_transactions(root), name, role)
            }
            ParsedStructure::Table(rows) => from_transactions(
                &table_transactions(rows),
                text_owner_name(&output.text),
                text_role(&output.text),
            ),
            ParsedStructure::TagValues(pairs) => {
                let name = pairs
                    .iter()
                    .find(|(tag, _)| loose_field(tag) == Some(LooseField::Owner))
                    .map(|(_, value)| value.clone());
                from_transactions(&loose_transactions(pairs), name, None)
            }
            ParsedStructure::Text(labeled) => from_text(labeled),
        }
    }
}

fn from_transactions(
    transactions: &[TransactionRecord],
    name: Option<String>,
    role: Option<String>,
) -> Result<FormFindings> {
    if transactions.is_empty() {
        return Err(insufficient("no non-derivative transactions in Form 4"));
    }
    let totals = aggregate(transactions);

    let mut findings = FormFindings::new(totals.event_type, Impact::Medium, Dilutive::False);
    findings.insider_action = Some(totals.action);
    findings.insider_name = name;
    findings.insider_role = role;
    findings.shares = (totals.shares > 0.0).then_some(totals.shares);
    findings.value_usd = totals.value_usd;
    findings.price = totals.price;
    findings.transaction_type = totals.transaction_type;
    Ok(findings)
}

fn xml_owner(root: &XmlElement) -> (Option<String>, Option<String>) {
    let owner = root.find_all("reportingOwner").into_iter().next().unwrap_or(root);
    let name = owner.first_text(OWNER_NAME_TAGS);

    let flag = |tag: &str| xml_bool(owner.first_text(&[tag]).as_deref());
    let mut roles = Vec::new();
    if flag("isDirector") {
        roles.push("Director".to_string());
    }
    if flag("isOfficer") {
        match owner.first_text(&["officerTitle"]) {
            Some(title) => roles.push(format!("Officer ({})", title)),
            None => roles.push("Officer".to_string()),
        }
    }
    if flag("isTenPercentOwner") {
        roles.push("10% Owner".to_string());
    }
    if flag("isOther") {
        roles.push(owner.first_text(&["otherText"]).unwrap_or_else(|| "Other".to_string()));
    }

    (name, (!roles.is_empty()).then(|| roles.join(", ")))
}

fn xml_transactions(root: &XmlElement) -> Vec<TransactionRecord> {
    root.find_all("nonDerivativeTransaction")
        .into_iter()
        .filter_map(|txn| {
            let shares = txn.value_in("transactionShares").and_then(|v| parse_number(&v))?;
            let price = txn
                .value_in("transactionPricePerShare")
                .and_then(|v| parse_number(&v));
            let code = txn.first_text(&["transactionCode"]).unwrap_or_default();
            let acquired_disposed = txn
                .value_in("transactionAcquiredDisposedCode")
                .unwrap_or_default();
            Some(TransactionRecord::from_codes(&code, &acquired_disposed, shares, price))
        })
        .collect()
}

fn table_transactions(rows: &[Vec<String>]) -> Vec<TransactionRecord> {
    rows.iter()
        .filter_map(|cells| {
            let code = cells.get(CODE_CELL)?.trim();
            if !code.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                return None;
            }
            let shares = parse_number(cells.get(SHARES_CELL)?)?;
            let acquired_disposed = cells.get(ACQUIRED_DISPOSED_CELL).map(String::as_str).unwrap_or("");
            let price = cells
                .get(PRICE_CELL)
                .and_then(|cell| parse_number(&cell.replace('$', "")));
            Some(TransactionRecord::from_codes(code, acquired_disposed, shares, price))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LooseField {
    Shares,
    Price,
    AcquiredDisposed,
    Code,
    Owner,
}

fn loose_field(tag: &str) -> Option<LooseField> {
    let key = normalize_tag_key(tag);
    if key.contains("transactionacquireddisposedcode") {
        Some(LooseField::AcquiredDisposed)
    } else if key.contains("transactionpricepershare") {
        Some(LooseField::Price)
    } else if key.contains("transactionshares") {
        Some(LooseField::Shares)
    } else if key.contains("transactioncode") {
        Some(LooseField::Code)
    } else if key.contains("rptownername") {
        Some(LooseField::Owner)
    } else {
        None
    }
}

#[derive(Default)]
struct LooseGroup {
    shares: Option<String>,
    price: Option<String>,
    acquired_disposed: Option<String>,
    code: Option<String>,
}

impl LooseGroup {
    fn slot(&mut self, field: LooseField) -> Option<&mut Option<String>> {
        match field {
            LooseField::Shares => Some(&mut self.shares),
            LooseField::Price => Some(&mut self.price),
            LooseField::AcquiredDisposed => Some(&mut self.acquired_disposed),
            LooseField::Code => Some(&mut self.code),
            LooseField::Owner => None,
        }
    }

    fn into_record(self) -> Option<TransactionRecord> {
        let shares = parse_number(self.shares.as_deref()?)?;
        Some(TransactionRecord::from_codes(
            self.code.as_deref().unwrap_or(""),
            self.acquired_disposed.as_deref().unwrap_or(""),
            shares,
            self.price.as_deref().and_then(parse_number),
        ))
    }
}

/// Groups tag/value pairs into transactions in document order. A field seen twice
/// starts the next transaction.
fn loose_transactions(pairs: &[(String, String)]) -> Vec<TransactionRecord> {
    let mut groups = vec![LooseGroup::default()];
    for (tag, value) in pairs {
        let Some(field) = loose_field(tag) else {
            continue;
        };
        let needs_new = groups
            .last_mut()
            .and_then(|group| group.slot(field))
            .is_some_and(|slot| slot.is_some());
        if needs_new {
            groups.push(LooseGroup::default());
        }
        if let Some(slot) = groups.last_mut().and_then(|group| group.slot(field)) {
            *slot = Some(value.clone());
        }
    }
    groups.into_iter().filter_map(LooseGroup::into_record).collect()
}

fn from_text(labeled: &LabeledText) -> Result<FormFindings> {
    let shares = labeled
        .field("shares")
        .and_then(parse_number)
        .filter(|s| *s > 0.0)
        .ok_or_else(|| insufficient("no transaction shares in Form 4 text"))?;
    let price = labeled.field("price").and_then(parse_number).filter(|p| *p > 0.0);
    let action = text_direction(&labeled.text);

    let event_type = match action {
        InsiderAction::Buy => "insider buying",
        InsiderAction::Sell => "insider selling",
        InsiderAction::Mixed | InsiderAction::Unknown => "insider transaction",
    };
    let mut findings = FormFindings::new(event_type, Impact::Medium, Dilutive::False);
    findings.insider_action = Some(action);
    findings.insider_name = text_owner_name(&labeled.text);
    findings.insider_role = text_role(&labeled.text);
    findings.shares = Some(shares);
    findings.price = price;
    findings.value_usd = price.map(|p| p * shares);
    findings.transaction_type = text_transaction_type(&labeled.text).map(str::to_string);
    Ok(findings)
}

fn text_direction(text: &str) -> InsiderAction {
    if let Some(flag) = cached_regex!(r"(?i)Acquired\s+Disposed\s+Code\s*[:\-]?\s*([AD])\b")
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
    {
        return if flag.as_str().eq_ignore_ascii_case("A") {
            InsiderAction::Buy
        } else {
            InsiderAction::Sell
        };
    }
    let bought = cached_regex!(r"(?i)\b(purchased?|bought|acquired|acquisition)\b")
        .is_some_and(|re| re.is_match(text));
    let sold = cached_regex!(r"(?i)\b(sold|sale|sell|disposed|disposition)\b")
        .is_some_and(|re| re.is_match(text));
    match (bought, sold) {
        (true, true) => InsiderAction::Mixed,
        (true, false) => InsiderAction::Buy,
        (false, true) => InsiderAction::Sell,
        (false, false) => InsiderAction::Unknown,
    }
}

fn text_transaction_type(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    if lowered.contains("open market") {
        Some("open market")
    } else if lowered.contains("option exercise") || lowered.contains("exercise of option") {
        Some("option exercise")
    } else if lowered.contains("restricted stock unit")
        || lowered.contains("rsu")
        || lowered.contains("award")
    {
        Some("RSU/award")
    } else {
        None
    }
}

/// Name from the rendered "Name and Address of Reporting Person" box.
fn text_owner_name(text: &str) -> Option<String> {
    cached_regex!(r"(?i)Name and Address of Reporting Person\s*\*?\s*(.{2,80}?)\s*\(Last\)")?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Role from the rendered relationship checkboxes, e.g. "X Director".
fn text_role(text: &str) -> Option<String> {
    let markers = [
        (cached_regex!(r"(?i)\bX\s+Director\b"), "Director"),
        (cached_regex!(r"(?i)\bX\s+Officer\b"), "Officer"),
        (cached_regex!(r"(?i)\bX\s+10%\s+Owner\b"), "10% Owner"),
    ];
    let roles: Vec<&str> = markers
        .into_iter()
        .filter(|(re, _)| re.is_some_and(|re| re.is_match(text)))
        .map(|(_, role)| role)
        .collect();
    (!roles.is_empty()).then(|| roles.join(", "))
}
