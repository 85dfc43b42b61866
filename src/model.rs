//! Records produced by the pipeline and the form families it understands.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{EdgarError, Result};

/// A filing discovered for a symbol, before its document is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingReference {
    /// Upper-case ticker the filing was discovered for.
    pub symbol: String,
    /// Form type as listed by EDGAR, e.g. "4", "144", "8-K/A".
    pub form: String,
    /// Filing date, `YYYY-MM-DD`.
    pub date: String,
    /// Absolute URL of the primary document.
    pub link: String,
}

impl FilingReference {
    pub fn new(
        symbol: impl Into<String>,
        form: impl Into<String>,
        date: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            form: form.into(),
            date: date.into(),
            link: link.into(),
        }
    }
}

/// Form families with a dedicated interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormFamily {
    /// Form 4, statement of changes in beneficial ownership.
    InsiderTransaction,
    /// Form 144, notice of proposed sale.
    ProposedSale,
    /// Form 8-K.
    CurrentReport,
    /// Form 10-K.
    AnnualReport,
}

impl FormFamily {
    /// Maps an EDGAR form string onto a family. Amendments map onto their base form.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::UnsupportedForm` for anything outside the four families.
    pub fn from_form(form: &str) -> Result<Self> {
        let upper = form.trim().to_uppercase();
        if upper.starts_with("144") {
            Ok(FormFamily::ProposedSale)
        } else if upper.starts_with("8-K") {
            Ok(FormFamily::CurrentReport)
        } else if upper.starts_with("10-K") {
            Ok(FormFamily::AnnualReport)
        } else if upper == "4" || upper.starts_with("4/") {
            Ok(FormFamily::InsiderTransaction)
        } else {
            Err(EdgarError::UnsupportedForm(form.to_string()))
        }
    }

    /// Short label used as `formType` on records and as the summary prefix.
    pub fn label(&self) -> &'static str {
        match self {
            FormFamily::InsiderTransaction => "Form 4",
            FormFamily::ProposedSale => "Form 144",
            FormFamily::CurrentReport => "8-K",
            FormFamily::AnnualReport => "10-K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsiderAction {
    Buy,
    Sell,
    Mixed,
    Unknown,
}

/// Whether the filing implies new share issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dilutive {
    True,
    False,
    Unknown,
}

impl From<bool> for Dilutive {
    fn from(value: bool) -> Self {
        if value { Dilutive::True } else { Dilutive::False }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// Classified filing, the unit stored in the cache and returned by streams.
///
/// Serializes with camelCase keys so persisted caches and API payloads share one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingClassification {
    pub ticker: String,
    pub form_type: String,
    /// Raw EDGAR form string, e.g. "4/A".
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub date: String,
    pub link: String,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insider_action: Option<InsiderAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insider_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<bool>,
    pub dilutive: Dilutive,
    pub impact: Impact,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_error: Option<String>,
    /// Seconds since the epoch at UTC midnight of `date`, 0 when the date is unparseable.
    pub timestamp: i64,
    /// Milliseconds since the epoch when the record was produced.
    pub processed_at: i64,
    #[serde(default)]
    pub cache_version: String,
}

impl FilingClassification {
    /// True when the record describes a failure rather than a classified document.
    pub fn is_error(&self) -> bool {
        self.document_error.is_some()
    }
}

/// Seconds since the epoch at UTC midnight for a `YYYY-MM-DD` date, 0 when it does not parse.
pub fn date_timestamp(date: &str) -> i64 {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

/// Renders a number for summaries: integers without decimals, no thousands separators.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rounded = (value * 100.0).round() / 100.0;
        format!("{}", rounded)
    }
}
