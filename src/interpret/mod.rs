//! Form interpreters.
//!
//! Each form family has a unit struct that implements both [`FormSchema`] (what the
//! cascade should look for) and [`FormInterpreter`] (how the accepted structure becomes
//! a [`FormFindings`]). Interpreters are pure: the same cascade output always yields
//! the same findings.

use crate::error::{EdgarError, Result};
use crate::model::{Dilutive, FormFamily, Impact, InsiderAction};
use crate::parsing::cascade::{CascadeOutput, FormSchema};

pub mod annual_report;
pub mod current_report;
pub mod form144;
pub mod form4;

pub use annual_report::AnnualReportForm;
pub use current_report::CurrentReportForm;
pub use form144::ProposedSaleForm;
pub use form4::InsiderTransactionForm;

/// Semantic content of one filing, before summary and record assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFindings {
    pub event_type: String,
    pub insider_action: Option<InsiderAction>,
    pub insider_name: Option<String>,
    pub insider_role: Option<String>,
    pub shares: Option<f64>,
    pub value_usd: Option<f64>,
    pub price: Option<f64>,
    pub transaction_type: Option<String>,
    pub items: Vec<String>,
    pub material: Option<bool>,
    pub dilutive: Dilutive,
    pub impact: Impact,
    /// Estimated sale date (Form 144).
    pub sale_date: Option<String>,
}

impl FormFindings {
    pub fn new(event_type: impl Into<String>, impact: Impact, dilutive: Dilutive) -> Self {
        Self {
            event_type: event_type.into(),
            insider_action: None,
            insider_name: None,
            insider_role: None,
            shares: None,
            value_usd: None,
            price: None,
            transaction_type: None,
            items: Vec::new(),
            material: None,
            dilutive,
            impact,
            sale_date: None,
        }
    }
}

/// Turns an accepted cascade output into findings.
pub trait FormInterpreter: FormSchema {
    /// # Errors
    ///
    /// Returns `EdgarError::ParseError` with an "insufficient data" message when the
    /// minimal shape for the form cannot be recovered.
    fn interpret(&self, output: &CascadeOutput) -> Result<FormFindings>;
}

/// The interpreter for a form family.
pub fn interpreter_for(family: FormFamily) -> &'static dyn FormInterpreter {
    match family {
        FormFamily::InsiderTransaction => &InsiderTransactionForm,
        FormFamily::ProposedSale => &ProposedSaleForm,
        FormFamily::CurrentReport => &CurrentReportForm,
        FormFamily::AnnualReport => &AnnualReportForm,
    }
}

/// The cascade schema for a form family.
pub fn schema_for(family: FormFamily) -> &'static dyn FormSchema {
    match family {
        FormFamily::InsiderTransaction => &InsiderTransactionForm,
        FormFamily::ProposedSale => &ProposedSaleForm,
        FormFamily::CurrentReport => &CurrentReportForm,
        FormFamily::AnnualReport => &AnnualReportForm,
    }
}

pub(crate) fn insufficient(detail: impl std::fmt::Display) -> EdgarError {
    EdgarError::ParseError(format!("insufficient data: {}", detail))
}

/// One insider transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub action: InsiderAction,
    pub shares: f64,
    pub price: Option<f64>,
    pub transaction_type: Option<String>,
}

impl TransactionRecord {
    /// Builds a row from the raw transaction code and acquired/disposed flag.
    pub fn from_codes(code: &str, acquired_disposed: &str, shares: f64, price: Option<f64>) -> Self {
        Self {
            action: direction(code, acquired_disposed),
            shares,
            price,
            transaction_type: transaction_type(code).map(str::to_string),
        }
    }
}

/// Buy or sell for a transaction. The acquired/disposed flag wins over the code.
pub fn direction(code: &str, acquired_disposed: &str) -> InsiderAction {
    match acquired_disposed.trim().to_ascii_uppercase().as_str() {
        "A" => return InsiderAction::Buy,
        "D" => return InsiderAction::Sell,
        _ => {}
    }
    match code.trim().to_ascii_uppercase().as_str() {
        "P" | "M" | "A" => InsiderAction::Buy,
        "S" | "F" | "D" | "G" => InsiderAction::Sell,
        _ => InsiderAction::Unknown,
    }
}

/// Human label for a Form 4 transaction code.
pub fn transaction_type(code: &str) -> Option<&'static str> {
    match code.trim().to_ascii_uppercase().as_str() {
        "P" | "S" => Some("open market"),
        "M" => Some("option exercise"),
        "A" => Some("RSU/award"),
        "F" => Some("tax withholding"),
        "G" => Some("gift"),
        _ => None,
    }
}

/// Totals over a filing's transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub action: InsiderAction,
    pub event_type: &'static str,
    pub shares: f64,
    pub value_usd: Option<f64>,
    pub price: Option<f64>,
    pub transaction_type: Option<String>,
}

/// Sums buy and sell sides and reports the dominant one.
///
/// Buy dominates when its share total is at least the sell total. The action is
/// `Mixed` whenever both sides are non-zero, `Buy` or `Sell` when only one is, and
/// `Unknown` when no row has a direction. Price is the dominant side's dollar value
/// over its shares; rows without a price add shares but no value.
pub fn aggregate(transactions: &[TransactionRecord]) -> Aggregate {
    let side = |action: InsiderAction| {
        transactions
            .iter()
            .filter(|t| t.action == action)
            .fold((0.0_f64, 0.0_f64), |(shares, value), t| {
                (shares + t.shares, value + t.price.map(|p| p * t.shares).unwrap_or(0.0))
            })
    };
    let (buy_shares, buy_value) = side(InsiderAction::Buy);
    let (sell_shares, sell_value) = side(InsiderAction::Sell);

    let transaction_type = transactions
        .iter()
        .filter(|t| matches!(t.action, InsiderAction::Buy | InsiderAction::Sell))
        .find_map(|t| t.transaction_type.clone());

    if buy_shares == 0.0 && sell_shares == 0.0 {
        return Aggregate {
            action: InsiderAction::Unknown,
            event_type: "insider transaction",
            shares: transactions.iter().map(|t| t.shares).sum(),
            value_usd: None,
            price: None,
            transaction_type,
        };
    }

    let (action, event_type, shares, value) = if buy_shares >= sell_shares {
        let action = if sell_shares == 0.0 {
            InsiderAction::Buy
        } else {
            InsiderAction::Mixed
        };
        (action, "insider buying", buy_shares, buy_value)
    } else {
        let action = if buy_shares == 0.0 {
            InsiderAction::Sell
        } else {
            InsiderAction::Mixed
        };
        (action, "insider selling", sell_shares, sell_value)
    };

    Aggregate {
        action,
        event_type,
        shares,
        value_usd: (value > 0.0).then_some(value),
        price: (value > 0.0).then(|| value / shares),
        transaction_type,
    }
}
