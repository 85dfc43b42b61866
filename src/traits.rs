//! Trait definitions at the seams of the filing pipeline.
//!
//! The pipeline never talks to the network directly. It consumes three injected
//! collaborators:
//!
//! - [`DocumentSource`] downloads a filing document by link.
//! - [`FilingDiscovery`] lists the filings to classify for a symbol.
//! - [`CikLookup`] resolves a ticker into a zero-padded CIK.
//!
//! The `Edgar` client implements `DocumentSource`, `TickerMap` implements
//! `CikLookup` and `EdgarDiscovery` implements `FilingDiscovery`. Tests swap in
//! in-memory implementations.
//!
//! The feature-gated `CompanyOperations` and `FilingOperations` traits group the
//! raw EDGAR endpoints the collaborators are built on.

#[cfg(feature = "company")]
use super::company::CompanyTicker;
use super::error::Result;
#[cfg(feature = "filings")]
use super::filings::Submission;
use super::model::FilingReference;
#[cfg(feature = "filings")]
use super::options::FilingOptions;
use async_trait::async_trait;
use std::collections::HashMap;

/// Retrieves raw filing documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Checks shared setup before a batch starts. A `ConfigError` here aborts the batch.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Downloads the document behind `link` and returns its decoded text.
    async fn fetch_filing_payload(&self, link: &str) -> Result<String>;
}

/// Lists filing references for a ticker, already filtered to the target forms
/// and capped per symbol, newest first.
#[async_trait]
pub trait FilingDiscovery: Send + Sync {
    async fn filing_references(&self, symbol: &str) -> Result<Vec<FilingReference>>;
}

/// Resolves a ticker into a zero-padded 10 digit CIK.
#[async_trait]
pub trait CikLookup: Send + Sync {
    async fn cik_for(&self, symbol: &str) -> Result<String>;
}

/// A fixed map works as a lookup, keyed by upper-case ticker.
#[async_trait]
impl CikLookup for HashMap<String, String> {
    async fn cik_for(&self, symbol: &str) -> Result<String> {
        let key = symbol.trim().to_uppercase();
        self.get(&key)
            .map(|cik| format!("{:0>10}", cik))
            .ok_or(super::error::EdgarError::TickerNotFound(key))
    }
}

/// Operations for resolving companies by ticker.
///
/// Ticker data comes from the SEC's `company_tickers.json` file, which maps every
/// listed ticker to its Central Index Key. Most callers use `TickerMap`, which adds
/// persistence and a refresh interval on top of these calls.
#[cfg(feature = "company")]
#[async_trait]
pub trait CompanyOperations {
    /// Retrieves a list of all company tickers from EDGAR.
    async fn company_tickers(&self) -> Result<Vec<CompanyTicker>>;
    /// Retrieves the Central Index Key (CIK) for a given company ticker symbol.
    async fn company_cik(&self, ticker: &str) -> Result<u64>;
}

/// Operations for listing a company's filings.
///
/// Filing listings come from the submissions API, which returns the most recent
/// filings of a company as parallel columns. `filing_references` turns those
/// columns into absolute document links for the pipeline.
#[cfg(feature = "filings")]
#[async_trait]
pub trait FilingOperations {
    /// Retrieves all submissions for a specific company identified by CIK.
    async fn submissions(&self, cik: &str) -> Result<Submission>;
    /// Lists recent filings for `symbol` whose CIK is `cik`, filtered and capped by `opts`.
    async fn filing_references(
        &self,
        symbol: &str,
        cik: &str,
        opts: &FilingOptions,
    ) -> Result<Vec<FilingReference>>;
}
