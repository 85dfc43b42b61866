#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use edgarlens::{
    DocumentSource, EdgarError, FilingCache, FilingDiscovery, FilingPipeline, FilingReference,
    PipelineConfig, Result,
};

pub fn fixture_path(relative: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn read_fixture(relative: impl AsRef<Path>) -> String {
    fs::read_to_string(fixture_path(relative)).expect("fixture file should be readable")
}

pub fn edgar() -> edgarlens::Edgar {
    edgarlens::Edgar::new("edgarlens-tests ops@edgarlens.dev").unwrap()
}

/// Serves documents from memory and counts fetches per link.
#[derive(Default)]
pub struct FakeSource {
    documents: HashMap<String, std::result::Result<String, String>>,
    fetches: Arc<AtomicUsize>,
    misconfigured: bool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, link: &str, body: impl Into<String>) -> Self {
        self.documents.insert(link.to_string(), Ok(body.into()));
        self
    }

    pub fn with_fixture(self, link: &str, fixture: &str) -> Self {
        self.with_document(link, read_fixture(fixture))
    }

    /// Makes `link` fail the way a timed-out request does.
    pub fn with_failure(mut self, link: &str, message: &str) -> Self {
        self.documents.insert(link.to_string(), Err(message.to_string()));
        self
    }

    /// Fails preflight as a missing identification header would.
    pub fn misconfigured(mut self) -> Self {
        self.misconfigured = true;
        self
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.fetches.clone()
    }
}

#[async_trait]
impl DocumentSource for FakeSource {
    fn preflight(&self) -> Result<()> {
        if self.misconfigured {
            return Err(EdgarError::ConfigError("SEC user agent is not configured".into()));
        }
        Ok(())
    }

    async fn fetch_filing_payload(&self, link: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.documents.get(link) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(EdgarError::FetchError(message.clone())),
            None => Err(EdgarError::NotFound),
        }
    }
}

/// Returns fixed references per symbol, or a fixed error.
#[derive(Default)]
pub struct FakeDiscovery {
    references: HashMap<String, Vec<FilingReference>>,
    failures: HashMap<String, fn() -> EdgarError>,
}

impl FakeDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filing(mut self, symbol: &str, form: &str, date: &str, link: &str) -> Self {
        self.references
            .entry(symbol.to_uppercase())
            .or_default()
            .push(FilingReference::new(symbol, form, date, link));
        self
    }

    pub fn with_failure(mut self, symbol: &str, error: fn() -> EdgarError) -> Self {
        self.failures.insert(symbol.to_uppercase(), error);
        self
    }
}

#[async_trait]
impl FilingDiscovery for FakeDiscovery {
    async fn filing_references(&self, symbol: &str) -> Result<Vec<FilingReference>> {
        let key = symbol.trim().to_uppercase();
        if let Some(error) = self.failures.get(&key) {
            return Err(error());
        }
        Ok(self.references.get(&key).cloned().unwrap_or_default())
    }
}

pub fn pipeline(source: FakeSource, discovery: FakeDiscovery, cache: Arc<FilingCache>) -> FilingPipeline {
    pipeline_with(source, discovery, cache, PipelineConfig::default())
}

pub fn pipeline_with(
    source: FakeSource,
    discovery: FakeDiscovery,
    cache: Arc<FilingCache>,
    config: PipelineConfig,
) -> FilingPipeline {
    FilingPipeline::new(Arc::new(source), Arc::new(discovery), cache, config)
}
