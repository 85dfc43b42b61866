use super::Edgar;
use super::company::pad_cik;
use super::error::{EdgarError, Result};
use super::model::FilingReference;
use super::options::FilingOptions;
use super::traits::{CikLookup, FilingDiscovery, FilingOperations};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub cik: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    pub filings: FilingsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilingsData {
    pub recent: RecentFilings,
}

/// Recent filings as parallel columns, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentFilings {
    #[serde(rename = "accessionNumber")]
    pub accession_number: Vec<String>,
    #[serde(rename = "filingDate", default)]
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub form: Vec<String>,
    #[serde(rename = "primaryDocument")]
    pub primary_document: Option<Vec<String>>,
}

impl RecentFilings {
    fn column_at(column: &[String], idx: usize) -> &str {
        column.get(idx).map(String::as_str).unwrap_or("")
    }

    fn primary_document_at(&self, idx: usize) -> &str {
        self.primary_document
            .as_deref()
            .map(|docs| Self::column_at(docs, idx))
            .unwrap_or("")
    }
}

impl Edgar {
    /// Builds the document link for a filing.
    ///
    /// Links point at the primary document when one is listed and at the filing's
    /// `-index.html` page otherwise. The CIK path segment is unpadded.
    fn filing_link(&self, cik: &str, accession_number: &str, primary_document: &str) -> String {
        let cik_segment = cik
            .trim()
            .parse::<u64>()
            .map(|c| c.to_string())
            .unwrap_or_else(|_| cik.trim().to_string());
        let base = format!(
            "{}/data/{}/{}",
            self.edgar_archives_url,
            cik_segment,
            accession_number.replace('-', "")
        );
        if primary_document.trim().is_empty() {
            format!("{}/{}-index.html", base, accession_number)
        } else {
            format!("{}/{}", base, primary_document.trim())
        }
    }

    /// Turns a submissions listing into filing references for `symbol`.
    pub fn references_from_submission(
        &self,
        symbol: &str,
        cik: &str,
        submission: &Submission,
        opts: &FilingOptions,
    ) -> Vec<FilingReference> {
        let recent = &submission.filings.recent;
        let limit = opts.limit.unwrap_or(usize::MAX);

        recent
            .accession_number
            .iter()
            .enumerate()
            .filter(|(idx, _)| opts.matches(RecentFilings::column_at(&recent.form, *idx)))
            .take(limit)
            .map(|(idx, accession)| {
                FilingReference::new(
                    symbol,
                    RecentFilings::column_at(&recent.form, idx),
                    RecentFilings::column_at(&recent.filing_date, idx),
                    self.filing_link(cik, accession, recent.primary_document_at(idx)),
                )
            })
            .collect()
    }
}

/// Implementation of filing operations for the Edgar system.
///
/// # Errors
///
/// Methods may return various error types wrapped in `Result`:
/// - `EdgarError::NotFound`: When requested data is not found
/// - `EdgarError::JsonError`: When response data is malformed
/// - `EdgarError::ConfigError`: When SEC.gov rejects the identification string
/// - Network-related errors during HTTP requests
#[async_trait]
impl FilingOperations for Edgar {
    /// Retrieves submission history for a given CIK.
    ///
    /// # Parameters
    ///
    /// * `cik` - The Central Index Key of the company, padded or not.
    ///
    /// # Errors
    ///
    /// * `EdgarError::NotFound` - If the submission details for the given CIK are not found.
    /// * `EdgarError::JsonError` - If the response data is malformed.
    async fn submissions(&self, cik: &str) -> Result<Submission> {
        let url = format!("{}/submissions/CIK{}.json", self.edgar_data_url, pad_cik(cik));
        let response = self.get(&url).await?;
        Ok(serde_json::from_str::<Submission>(&response)?)
    }

    async fn filing_references(
        &self,
        symbol: &str,
        cik: &str,
        opts: &FilingOptions,
    ) -> Result<Vec<FilingReference>> {
        let submission = self.submissions(cik).await?;
        Ok(self.references_from_submission(symbol, cik, &submission, opts))
    }
}

/// Discovers filings by resolving a ticker and listing the company's submissions.
pub struct EdgarDiscovery {
    edgar: Edgar,
    lookup: Arc<dyn CikLookup>,
    options: FilingOptions,
}

impl EdgarDiscovery {
    pub fn new(edgar: Edgar, lookup: Arc<dyn CikLookup>, options: FilingOptions) -> Self {
        Self {
            edgar,
            lookup,
            options,
        }
    }
}

#[async_trait]
impl FilingDiscovery for EdgarDiscovery {
    async fn filing_references(&self, symbol: &str) -> Result<Vec<FilingReference>> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(EdgarError::TickerNotFound(symbol));
        }
        let cik = self.lookup.cik_for(&symbol).await?;
        let references =
            FilingOperations::filing_references(&self.edgar, &symbol, &cik, &self.options).await?;
        tracing::debug!("Discovered {} filings for {}", references.len(), symbol);
        Ok(references)
    }
}
