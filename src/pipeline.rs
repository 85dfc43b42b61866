//! Discovery, acquisition, parsing, interpretation and classification, per filing and
//! across symbols.
//!
//! Per-filing failures never escape [`FilingPipeline::process_filing`]: they become
//! technical-error records. Only shared setup failures (a missing or placeholder
//! identification header, or discovery rejecting it) abort a whole batch.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::time::Instant;

use crate::cache::FilingCache;
use crate::classify::{classify, error_record};
use crate::config::PipelineConfig;
use crate::error::{EdgarError, Result};
use crate::interpret::{interpreter_for, schema_for};
use crate::model::{FilingClassification, FilingReference, FormFamily};
use crate::parsing::cascade::ParseCascade;
use crate::traits::{DocumentSource, FilingDiscovery};

pub struct FilingPipeline {
    source: Arc<dyn DocumentSource>,
    discovery: Arc<dyn FilingDiscovery>,
    cache: Arc<FilingCache>,
    config: PipelineConfig,
}

impl FilingPipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        discovery: Arc<dyn FilingDiscovery>,
        cache: Arc<FilingCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            discovery,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &FilingCache {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Classifies one filing, reusing the cached record for its link when the cache
    /// version matches.
    pub async fn process_filing(&self, reference: &FilingReference) -> FilingClassification {
        let version = self.cache.version();
        if !reference.link.is_empty() {
            if let Some(cached) = self.cache.get(&reference.link).await {
                tracing::debug!("Cache hit for {}", reference.link);
                return cached;
            }
        }

        let record = match self.classify_document(reference).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "{} {} {} failed: {}",
                    reference.symbol,
                    reference.form,
                    reference.link,
                    e
                );
                error_record(reference, &e, version)
            }
        };

        if !record.link.is_empty() {
            if let Err(e) = self.cache.set(record.clone()).await {
                tracing::warn!("Could not cache {}: {}", record.link, e);
            }
        }
        record
    }

    async fn classify_document(&self, reference: &FilingReference) -> Result<FilingClassification> {
        let family = FormFamily::from_form(&reference.form)?;
        let payload = self.source.fetch_filing_payload(&reference.link).await?;

        let output = ParseCascade::run(&payload, schema_for(family), self.config.max_text_chars)
            .map_err(EdgarError::ParseError)?;
        let findings = interpreter_for(family).interpret(&output)?;

        Ok(classify(reference, family, findings, self.cache.version()))
    }

    /// Classifies the filings discovered for one symbol, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns the discovery error, or a `ConfigError` from the document source's
    /// preflight check.
    pub async fn filings(&self, symbol: &str) -> Result<Vec<FilingClassification>> {
        self.source.preflight()?;
        self.process_symbol(symbol, self.deadline()).await
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        deadline: Option<Instant>,
    ) -> Result<Vec<FilingClassification>> {
        let references = self.discovery.filing_references(symbol).await?;
        let mut records = Vec::with_capacity(references.len());

        for reference in references.iter().take(self.config.per_symbol_limit) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::info!(
                    "Batch budget exhausted; skipping remaining filings for {}",
                    symbol
                );
                break;
            }
            records.push(self.process_filing(reference).await);
        }
        Ok(records)
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.batch_budget.map(|budget| Instant::now() + budget)
    }

    /// Classifies filings for every symbol concurrently and merges them into one
    /// stream, newest first, deduplicated and capped at the configured limit.
    ///
    /// A symbol whose discovery fails is skipped with a warning. Failed documents
    /// appear as technical-error records.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::ConfigError` when the identification header is missing or
    /// rejected, before or during discovery.
    pub async fn filings_stream<S: AsRef<str>>(
        &self,
        symbols: &[S],
    ) -> Result<Vec<FilingClassification>> {
        self.source.preflight()?;
        let deadline = self.deadline();

        let mut seen = HashSet::new();
        let unique: Vec<String> = symbols
            .iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();

        let results = join_all(
            unique
                .iter()
                .map(|symbol| self.process_symbol(symbol, deadline)),
        )
        .await;

        let mut records = Vec::new();
        for (symbol, result) in unique.iter().zip(results) {
            match result {
                Ok(batch) => records.extend(batch),
                Err(e) if e.is_config() => return Err(e),
                Err(e) => tracing::warn!("Skipping {}: {}", symbol, e),
            }
        }

        tracing::info!(
            "Classified {} filings for {} symbols",
            records.len(),
            unique.len()
        );
        Ok(assemble_stream(records, self.config.stream_limit))
    }
}

/// Sorts by filing timestamp descending, keeps the first record per key and caps the
/// result at `limit`.
///
/// The key is the link, or `(summary, date, ticker, form type)` when the link is empty.
/// The sort is stable, so records with equal timestamps keep their input order.
pub fn assemble_stream(
    mut records: Vec<FilingClassification>,
    limit: usize,
) -> Vec<FilingClassification> {
    if limit == 0 {
        return Vec::new();
    }
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(limit.min(records.len()));
    for record in records {
        let key = if record.link.is_empty() {
            format!(
                "{}\u{1f}{}\u{1f}{}\u{1f}{}",
                record.summary, record.date, record.ticker, record.form_type
            )
        } else {
            record.link.clone()
        };
        if !seen.insert(key) {
            continue;
        }
        merged.push(record);
        if merged.len() >= limit {
            break;
        }
    }
    merged
}
