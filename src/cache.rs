//! Versioned classification cache with a durable JSON file behind it.
//!
//! The cache is an explicit object: build it once with [`FilingCache::open`] (or
//! [`FilingCache::in_memory`] for tests) and hand it to the pipeline. Every write
//! holds the lock through read-modify-write and persistence, so concurrent writers
//! never interleave partial files.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{EdgarError, Result};
use crate::model::FilingClassification;

/// Writes `bytes` to a sibling temp file and renames it over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Classifications keyed by filing link.
#[derive(Debug)]
pub struct FilingCache {
    path: Option<PathBuf>,
    max_entries: usize,
    version: String,
    entries: Mutex<BTreeMap<String, FilingClassification>>,
}

impl FilingCache {
    /// A cache that never touches disk.
    pub fn in_memory(max_entries: usize, version: impl Into<String>) -> Self {
        Self {
            path: None,
            max_entries: max_entries.max(1),
            version: version.into(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Opens the cache persisted at `path`. A missing file starts empty; an unreadable
    /// or corrupt one is logged and replaced on the next write.
    pub async fn open(
        path: impl Into<PathBuf>,
        max_entries: usize,
        version: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, FilingClassification>>(&bytes)
                .unwrap_or_else(|e| {
                    tracing::warn!("Ignoring corrupt filing cache {}: {}", path.display(), e);
                    BTreeMap::new()
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Could not read filing cache {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        tracing::debug!("Loaded {} cached filings from {}", entries.len(), path.display());

        Self {
            path: Some(path),
            max_entries: max_entries.max(1),
            version: version.into(),
            entries: Mutex::new(entries),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The record for `link` under the current version.
    pub async fn get(&self, link: &str) -> Option<FilingClassification> {
        self.get_versioned(link, &self.version).await
    }

    /// The record for `link` if it was stored under `version`. Any other version is a miss.
    pub async fn get_versioned(&self, link: &str, version: &str) -> Option<FilingClassification> {
        let entries = self.entries.lock().await;
        entries
            .get(link)
            .filter(|record| record.cache_version == version)
            .cloned()
    }

    /// Stores `record` under its link, tagged with the current version, then evicts and
    /// persists.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::CacheError` when the file cannot be written. The record is
    /// kept in memory either way.
    pub async fn set(&self, mut record: FilingClassification) -> Result<()> {
        record.cache_version = self.version.clone();
        let mut entries = self.entries.lock().await;
        entries.insert(record.link.clone(), record);
        Self::evict_locked(&mut entries, self.max_entries);
        self.persist_locked(&entries).await
    }

    /// Drops everything but the `max_entries` most recently processed records.
    pub async fn evict(&self) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if Self::evict_locked(&mut entries, self.max_entries) > 0 {
            self.persist_locked(&entries).await?;
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Ties on `processedAt` keep the lexicographically smaller link.
    fn evict_locked(entries: &mut BTreeMap<String, FilingClassification>, max: usize) -> usize {
        if entries.len() <= max {
            return 0;
        }
        let mut ranked: Vec<(i64, String)> = entries
            .iter()
            .map(|(link, record)| (record.processed_at, link.clone()))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let dropped: Vec<String> = ranked.into_iter().skip(max).map(|(_, link)| link).collect();
        for link in &dropped {
            entries.remove(link);
        }
        tracing::debug!("Evicted {} cached filings", dropped.len());
        dropped.len()
    }

    async fn persist_locked(&self, entries: &BTreeMap<String, FilingClassification>) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(entries)
            .map_err(|e| EdgarError::CacheError(format!("serialize: {}", e)))?;
        write_atomic(path, &bytes)
            .await
            .map_err(|e| EdgarError::CacheError(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dilutive, Impact};

    fn record(link: &str, processed_at: i64) -> FilingClassification {
        FilingClassification {
            ticker: "AAPL".into(),
            form_type: "8-K".into(),
            form: "8-K".into(),
            date: "2024-05-01".into(),
            link: link.into(),
            event_type: "disclosure".into(),
            insider_action: None,
            insider_name: None,
            insider_role: None,
            shares: None,
            value_usd: None,
            price: None,
            transaction_type: None,
            items: vec!["7.01".into()],
            material: Some(false),
            dilutive: Dilutive::False,
            impact: Impact::Medium,
            summary: "8-K items: 7.01. Event: disclosure.".into(),
            document_error: None,
            timestamp: 1_714_521_600,
            processed_at,
            cache_version: String::new(),
        }
    }

    #[tokio::test]
    async fn test_version_mismatch_is_a_miss() {
        let cache = FilingCache::in_memory(10, "v2");
        cache.set(record("a", 1)).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().cache_version, "v2");
        assert!(cache.get_versioned("a", "v1").await.is_none());
        assert!(cache.get("b").await.is_none());
    }

    #[tokio::test]
    async fn test_eviction_keeps_most_recently_processed() {
        let cache = FilingCache::in_memory(3, "v1");
        for (link, at) in [("a", 40), ("b", 10), ("c", 30), ("d", 20)] {
            cache.set(record(link, at)).await.unwrap();
        }
        assert_eq!(cache.len().await, 3);
        assert!(cache.get("b").await.is_none());
        for link in ["a", "c", "d"] {
            assert!(cache.get(link).await.is_some(), "{} evicted", link);
        }
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("filings.json");

        let cache = FilingCache::open(&path, 10, "v1").await;
        cache.set(record("https://www.sec.gov/x", 5)).await.unwrap();
        assert!(path.exists());

        let reopened = FilingCache::open(&path, 10, "v1").await;
        assert_eq!(reopened.len().await, 1);
        assert!(reopened.get("https://www.sec.gov/x").await.is_some());

        let bumped = FilingCache::open(&path, 10, "v2").await;
        assert!(bumped.get("https://www.sec.gov/x").await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_file_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filings.json");
        let cache = std::sync::Arc::new(FilingCache::open(&path, 100, "v1").await);

        let writes = (0..64).map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .set(record(&format!("https://www.sec.gov/doc/{}", i), i))
                    .await
            })
        });
        for result in futures_util::future::join_all(writes).await {
            result.unwrap().unwrap();
        }
        assert_eq!(cache.len().await, 64);

        let bytes = std::fs::read(&path).unwrap();
        let persisted: BTreeMap<String, FilingClassification> =
            serde_json::from_slice(&bytes).unwrap();
        assert_eq!(persisted.len(), 64);

        let reopened = FilingCache::open(&path, 100, "v1").await;
        for i in 0..64 {
            let link = format!("https://www.sec.gov/doc/{}", i);
            assert!(reopened.get(&link).await.is_some(), "{} missing", link);
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filings.json");
        std::fs::write(&path, "{not json").unwrap();
        let cache = FilingCache::open(&path, 10, "v1").await;
        assert!(cache.is_empty().await);
    }
}
