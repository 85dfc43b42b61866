//! Ticker to CIK resolution.
//!
//! The SEC publishes one file mapping every listed ticker to its Central Index Key.
//! [`TickerMap`] keeps that mapping in memory, persists it next to the filings cache
//! and refreshes it after a fixed interval, so only one request per interval hits
//! SEC.gov no matter how many symbols are resolved.

use super::Edgar;
use super::cache::write_atomic;
use super::error::{EdgarError, Result};
use super::traits::{CikLookup, CompanyOperations};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// CIKs resolved without a network round trip. Fetched data is layered over these.
const KNOWN_CIKS: &[(&str, &str)] = &[
    ("NVDA", "0001045810"),
    ("MRVL", "0001835632"),
    ("AMD", "0000002488"),
    ("UNH", "0000731766"),
    ("SOUN", "0001850453"),
    ("APLD", "0001787195"),
];

/// Mapping between stock ticker symbols and company CIKs.
///
/// This structure represents a company's stock ticker along with its Central Index Key
/// (CIK) and official title. Note that companies can have multiple tickers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompanyTicker {
    #[serde(rename = "cik_str")]
    pub cik: u64,
    pub ticker: String,
    pub title: String,
}

/// Left-pads a CIK with zeros to the 10 digits EDGAR URLs expect.
pub fn pad_cik(cik: impl std::fmt::Display) -> String {
    format!("{:0>10}", cik)
}

/// Parses the body of `company_tickers.json`, an object keyed by row number.
pub fn parse_company_tickers(content: &str) -> Result<Vec<CompanyTicker>> {
    let map: HashMap<String, CompanyTicker> = serde_json::from_str(content)?;
    let mut tickers: Vec<CompanyTicker> = map.into_values().collect();
    tickers.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    Ok(tickers)
}

#[async_trait]
impl CompanyOperations for Edgar {
    /// Retrieves a list of company tickers from the SEC EDGAR database.
    ///
    /// # Errors
    ///
    /// * `EdgarError::RequestError` - If there was an error sending the request or reading the response.
    /// * `EdgarError::NotFound` - If the company_tickers.json file was not found.
    /// * `EdgarError::JsonError` - If the response couldn't be parsed as expected.
    async fn company_tickers(&self) -> Result<Vec<CompanyTicker>> {
        let url = format!("{}/company_tickers.json", self.edgar_files_url);
        let response = self.get(&url).await?;
        parse_company_tickers(&response)
    }

    /// Retrieves the Central Index Key (CIK) for a given company ticker symbol.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::TickerNotFound` if the provided ticker symbol is not found.
    async fn company_cik(&self, ticker: &str) -> Result<u64> {
        let wanted = ticker.trim().to_uppercase();
        let tickers = self.company_tickers().await?;

        tickers
            .iter()
            .find(|t| t.ticker.eq_ignore_ascii_case(&wanted))
            .map(|t| t.cik)
            .ok_or(EdgarError::TickerNotFound(wanted))
    }
}

/// On-disk shape of the persisted map.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedTickers {
    /// Seconds since the epoch when the map was fetched.
    fetched_at: i64,
    tickers: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct TickerState {
    tickers: BTreeMap<String, String>,
    loaded_at: Option<Instant>,
}

/// Cached ticker to CIK map with a refresh interval.
///
/// Resolution order on a stale or empty map:
///
/// 1. The persisted file, if it is younger than the TTL.
/// 2. A fresh download, layered over the built-in seed table and persisted.
/// 3. The persisted file regardless of age, then the seed table alone.
///
/// A failed refresh never fails a lookup by itself; only a ticker missing from
/// whatever map was loaded yields `TickerNotFound`.
pub struct TickerMap {
    source: Arc<dyn CompanyOperations + Send + Sync>,
    path: Option<PathBuf>,
    ttl: Duration,
    state: RwLock<TickerState>,
}

impl TickerMap {
    /// Creates a map that refreshes from `source` every `ttl` and persists to `path`.
    pub fn new(
        source: Arc<dyn CompanyOperations + Send + Sync>,
        path: Option<PathBuf>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            path,
            ttl,
            state: RwLock::new(TickerState::default()),
        }
    }

    /// Creates a map backed by the `Edgar` client.
    pub fn from_edgar(edgar: Edgar, path: Option<PathBuf>, ttl: Duration) -> Self {
        Self::new(Arc::new(edgar), path, ttl)
    }

    fn seed() -> BTreeMap<String, String> {
        KNOWN_CIKS
            .iter()
            .map(|(ticker, cik)| (ticker.to_string(), cik.to_string()))
            .collect()
    }

    async fn load_persisted(&self) -> Option<PersistedTickers> {
        let path = self.path.as_ref()?;
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read ticker cache {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<PersistedTickers>(&content) {
            Ok(persisted) if !persisted.tickers.is_empty() => Some(persisted),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring corrupt ticker cache {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn persist(&self, tickers: &BTreeMap<String, String>) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let persisted = PersistedTickers {
            fetched_at: Utc::now().timestamp(),
            tickers: tickers.clone(),
        };
        match serde_json::to_vec(&persisted) {
            Ok(bytes) => {
                if let Err(e) = write_atomic(path, &bytes).await {
                    tracing::warn!("Could not persist ticker cache {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize ticker cache: {}", e),
        }
    }

    async fn resolve_fresh_map(&self) -> BTreeMap<String, String> {
        let persisted = self.load_persisted().await;
        if let Some(persisted) = &persisted {
            let age = Utc::now().timestamp() - persisted.fetched_at;
            if age >= 0 && (age as u64) < self.ttl.as_secs() {
                return persisted.tickers.clone();
            }
        }

        match self.source.company_tickers().await {
            Ok(rows) => {
                let mut tickers = Self::seed();
                for row in rows {
                    tickers.insert(row.ticker.trim().to_uppercase(), pad_cik(row.cik));
                }
                tracing::info!("Refreshed ticker map with {} entries", tickers.len());
                self.persist(&tickers).await;
                tickers
            }
            Err(e) => {
                tracing::warn!("Ticker map refresh failed, using fallback: {}", e);
                persisted.map(|p| p.tickers).unwrap_or_else(Self::seed)
            }
        }
    }

    /// Resolves `symbol` into a zero-padded CIK, refreshing the map when it is stale.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::TickerNotFound` if the ticker is not in the loaded map.
    pub async fn resolve(&self, symbol: &str) -> Result<String> {
        let key = symbol.trim().to_uppercase();
        {
            let state = self.state.read().await;
            if state.loaded_at.is_some_and(|at| at.elapsed() < self.ttl) {
                return state
                    .tickers
                    .get(&key)
                    .cloned()
                    .ok_or(EdgarError::TickerNotFound(key));
            }
        }

        let mut state = self.state.write().await;
        if !state.loaded_at.is_some_and(|at| at.elapsed() < self.ttl) {
            state.tickers = self.resolve_fresh_map().await;
            state.loaded_at = Some(Instant::now());
        }
        state
            .tickers
            .get(&key)
            .cloned()
            .ok_or(EdgarError::TickerNotFound(key))
    }
}

#[async_trait]
impl CikLookup for TickerMap {
    async fn cik_for(&self, symbol: &str) -> Result<String> {
        self.resolve(symbol).await
    }
}
