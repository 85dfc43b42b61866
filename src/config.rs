use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{EdgarError, Result};

/// Contact strings shipped in sample configs. The SEC rejects them, so they count as missing.
const PLACEHOLDER_AGENTS: &[&str] = &["you@example.com", "your-email@example.com", "name@domain.com"];

/// Configuration for the Edgar client
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    /// User agent string for HTTP requests. Must carry real contact details.
    pub user_agent: String,
    /// Rate limit in requests per second
    pub rate_limit: u32,
    /// Timeout applied to every HTTP request. Requests are never retried.
    pub timeout: Duration,
    /// Base URLs for different EDGAR services
    pub base_urls: EdgarUrls,
}

/// Base URLs for different EDGAR services
#[derive(Debug, Clone)]
pub struct EdgarUrls {
    /// Base URL for EDGAR archives
    pub archives: String,
    /// Base URL for EDGAR data
    pub data: String,
    /// Base URL for EDGAR files
    pub files: String,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            rate_limit: 10,
            timeout: Duration::from_secs(8),
            base_urls: EdgarUrls::default(),
        }
    }
}

impl EdgarConfig {
    /// Creates a new EdgarConfig with custom settings
    ///
    /// # Basic usage
    ///
    /// ```rust
    /// use edgarlens::{EdgarConfig, EdgarUrls};
    /// use std::time::Duration;
    ///
    /// let config = EdgarConfig::new(
    ///     "YourAppName contact@yourdomain.com",
    ///     10,
    ///     Duration::from_secs(8),
    ///     Some(EdgarUrls::default()),
    /// );
    /// assert_eq!(config.rate_limit, 10);
    /// ```
    pub fn new(
        user_agent: impl Into<String>,
        rate_limit: u32,
        timeout: Duration,
        base_urls: Option<EdgarUrls>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            rate_limit,
            timeout,
            base_urls: base_urls.unwrap_or_default(),
        }
    }
}

impl Default for EdgarUrls {
    fn default() -> Self {
        Self {
            archives: "https://www.sec.gov/Archives/edgar".to_string(),
            data: "https://data.sec.gov".to_string(),
            files: "https://www.sec.gov/files".to_string(),
        }
    }
}

/// Checks that the identification string is present and not a known placeholder.
///
/// SEC.gov answers anonymous or placeholder user agents with 403, so this is
/// reported as a configuration problem before any request is made.
pub fn validate_user_agent(user_agent: &str) -> Result<()> {
    let trimmed = user_agent.trim();
    if trimmed.is_empty() {
        return Err(EdgarError::ConfigError(
            "SEC user agent is not configured; set SEC_USER_AGENT or secUserAgent to a string with a real contact email".to_string(),
        ));
    }
    let lowered = trimmed.to_ascii_lowercase();
    if PLACEHOLDER_AGENTS.iter().any(|p| lowered.contains(p)) {
        return Err(EdgarError::ConfigError(format!(
            "SEC user agent '{}' is a placeholder; replace it with a real contact email",
            trimmed
        )));
    }
    Ok(())
}

/// Settings for the ingestion pipeline, cache and stream assembly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where processed classifications are persisted. `None` keeps them in memory only.
    pub cache_path: Option<PathBuf>,
    /// Maximum number of cached classifications kept after eviction.
    pub cache_max_entries: usize,
    /// Version tag stored on every cached record. Bumping it invalidates the cache.
    pub cache_version: String,
    /// Maximum filings taken per symbol from discovery.
    pub per_symbol_limit: usize,
    /// Maximum records returned by a merged stream.
    pub stream_limit: usize,
    /// Character budget for normalized plain text.
    pub max_text_chars: usize,
    /// Wall-clock budget for a batch. Unstarted filings are skipped once exceeded.
    pub batch_budget: Option<Duration>,
    /// Where the ticker to CIK map is persisted.
    pub ticker_cache_path: Option<PathBuf>,
    /// Age after which the ticker to CIK map is refreshed.
    pub ticker_cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            cache_max_entries: 500,
            cache_version: "v1".to_string(),
            per_symbol_limit: 6,
            stream_limit: 12,
            max_text_chars: 6000,
            batch_budget: None,
            ticker_cache_path: None,
            ticker_cache_ttl: Duration::from_secs(60 * 60 * 12),
        }
    }
}

/// Client and pipeline settings loaded together.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub edgar: EdgarConfig,
    pub pipeline: PipelineConfig,
}

/// Optional JSON config file. Environment variables win over file values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileSettings {
    sec_user_agent: Option<String>,
    filings_cache_path: Option<PathBuf>,
    filings_cache_max: Option<usize>,
    filings_per_symbol_limit: Option<usize>,
    filings_limit: Option<usize>,
    filings_budget_sec: Option<u64>,
    sec_cache_path: Option<PathBuf>,
}

impl FileSettings {
    fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Could not read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl Settings {
    /// Loads settings from the process environment and the file named by `CONFIG_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// Recognized keys: `SEC_USER_AGENT`, `CONFIG_PATH`, `FILINGS_CACHE_PATH`,
    /// `FILINGS_CACHE_MAX`, `FILINGS_PER_SYMBOL_LIMIT`, `FILINGS_LIMIT`,
    /// `FILINGS_BUDGET_SEC`, `SEC_CACHE_PATH`. Numeric values below one or
    /// that fail to parse fall back to the file value, then the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = lookup("CONFIG_PATH")
            .map(|p| FileSettings::load(Path::new(&p)))
            .unwrap_or_default();
        let defaults = PipelineConfig::default();

        let user_agent = non_empty(lookup("SEC_USER_AGENT"))
            .or(file.sec_user_agent.clone())
            .unwrap_or_default();

        let pipeline = PipelineConfig {
            cache_path: non_empty(lookup("FILINGS_CACHE_PATH"))
                .map(PathBuf::from)
                .or(file.filings_cache_path),
            cache_max_entries: positive(&lookup, "FILINGS_CACHE_MAX")
                .or(file.filings_cache_max.filter(|v| *v > 0))
                .unwrap_or(defaults.cache_max_entries),
            per_symbol_limit: positive(&lookup, "FILINGS_PER_SYMBOL_LIMIT")
                .or(file.filings_per_symbol_limit.filter(|v| *v > 0))
                .unwrap_or(defaults.per_symbol_limit),
            stream_limit: positive(&lookup, "FILINGS_LIMIT")
                .or(file.filings_limit.filter(|v| *v > 0))
                .unwrap_or(defaults.stream_limit),
            batch_budget: positive(&lookup, "FILINGS_BUDGET_SEC")
                .map(|v| v as u64)
                .or(file.filings_budget_sec.filter(|v| *v > 0))
                .map(Duration::from_secs),
            ticker_cache_path: non_empty(lookup("SEC_CACHE_PATH"))
                .map(PathBuf::from)
                .or(file.sec_cache_path),
            ..defaults
        };

        Self {
            edgar: EdgarConfig {
                user_agent,
                ..EdgarConfig::default()
            },
            pipeline,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = non_empty(lookup(key))?;
    match raw.parse::<usize>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!("Ignoring invalid value for {}: {}", key, raw);
            None
        }
    }
}
