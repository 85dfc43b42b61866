//! Final record assembly: summary text, timestamps and the technical-error shape.

use chrono::Utc;

use crate::error::EdgarError;
use crate::interpret::FormFindings;
use crate::model::{
    Dilutive, FilingClassification, FilingReference, FormFamily, Impact, date_timestamp,
    format_number,
};

/// Event type of every record built from a failure.
pub const TECHNICAL_ERROR: &str = "technical error";

/// Builds the classification for a successfully interpreted filing.
pub fn classify(
    reference: &FilingReference,
    family: FormFamily,
    findings: FormFindings,
    cache_version: &str,
) -> FilingClassification {
    let summary = summarize(family, &findings);
    FilingClassification {
        ticker: reference.symbol.clone(),
        form_type: family.label().to_string(),
        form: reference.form.clone(),
        date: reference.date.clone(),
        link: reference.link.clone(),
        event_type: findings.event_type,
        insider_action: findings.insider_action,
        insider_name: findings.insider_name,
        insider_role: findings.insider_role,
        shares: findings.shares,
        value_usd: findings.value_usd,
        price: findings.price,
        transaction_type: findings.transaction_type,
        items: findings.items,
        material: findings.material,
        dilutive: findings.dilutive,
        impact: findings.impact,
        summary,
        document_error: None,
        timestamp: date_timestamp(&reference.date),
        processed_at: Utc::now().timestamp_millis(),
        cache_version: cache_version.to_string(),
    }
}

/// Builds the technical-error record for a filing that could not be fetched or parsed.
///
/// Transaction fields stay empty, impact is low and dilution unknown.
pub fn error_record(
    reference: &FilingReference,
    error: &EdgarError,
    cache_version: &str,
) -> FilingClassification {
    let detail = error_detail(error);
    let form_type = FormFamily::from_form(&reference.form)
        .map(|family| family.label().to_string())
        .unwrap_or_else(|_| reference.form.clone());

    FilingClassification {
        ticker: reference.symbol.clone(),
        form_type,
        form: reference.form.clone(),
        date: reference.date.clone(),
        link: reference.link.clone(),
        event_type: TECHNICAL_ERROR.to_string(),
        insider_action: None,
        insider_name: None,
        insider_role: None,
        shares: None,
        value_usd: None,
        price: None,
        transaction_type: None,
        items: Vec::new(),
        material: None,
        dilutive: Dilutive::Unknown,
        impact: Impact::Low,
        summary: format!("Technical error: {}", detail),
        document_error: Some(detail),
        timestamp: date_timestamp(&reference.date),
        processed_at: Utc::now().timestamp_millis(),
        cache_version: cache_version.to_string(),
    }
}

/// The message carried in `documentError`. Fetch and parse failures keep their raw
/// diagnostic; everything else uses the error's display form.
fn error_detail(error: &EdgarError) -> String {
    match error {
        EdgarError::FetchError(message) | EdgarError::ParseError(message) => message.clone(),
        other => other.to_string(),
    }
}

/// One line per record, built only from the fields that are present.
pub fn summarize(family: FormFamily, findings: &FormFindings) -> String {
    let mut parts: Vec<String> = Vec::new();
    let positive = |value: Option<f64>| value.filter(|v| *v > 0.0);

    match family {
        FormFamily::InsiderTransaction => {
            parts.push(format!("{}: {}.", family.label(), findings.event_type));
            if let Some(name) = &findings.insider_name {
                match &findings.insider_role {
                    Some(role) => parts.push(format!("Insider: {} ({}).", name, role)),
                    None => parts.push(format!("Insider: {}.", name)),
                }
            }
            if let Some(shares) = positive(findings.shares) {
                parts.push(format!("Shares: {}.", format_number(shares)));
            }
            if let Some(price) = positive(findings.price) {
                parts.push(format!("Average price: ${}.", format_number(price)));
            }
            if let Some(kind) = &findings.transaction_type {
                parts.push(format!("Type: {}.", kind));
            }
        }
        FormFamily::ProposedSale => {
            parts.push(format!("{}: {}.", family.label(), findings.event_type));
            if let Some(seller) = &findings.insider_name {
                parts.push(format!("Seller: {}.", seller));
            }
            if let Some(shares) = positive(findings.shares) {
                parts.push(format!("Shares: {}.", format_number(shares)));
            }
            if let Some(value) = positive(findings.value_usd) {
                parts.push(format!("Approx. value: ${}.", format_number(value)));
            }
            if let Some(date) = &findings.sale_date {
                parts.push(format!("Estimated date: {}.", date));
            }
        }
        FormFamily::CurrentReport => {
            parts.push(format!("{} items: {}.", family.label(), item_list(&findings.items)));
            parts.push(format!("Event: {}.", findings.event_type));
            if findings.material == Some(true) {
                parts.push("Material impact: yes.".to_string());
            }
        }
        FormFamily::AnnualReport => {
            parts.push(format!("{} items: {}.", family.label(), item_list(&findings.items)));
        }
    }

    parts.join(" ")
}

fn item_list(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}
