//! Bar-series cache keyed by exact (symbol, start date, end date).
//!
//! Layout of the file-backed store: `{cache_dir}/{SYMBOL}_{YYYYMMDD}_{YYYYMMDD}.json`
//!
//! - Exact-key matching only: an overlapping but different range is a miss
//! - Entries older than the TTL (default one day) are ignored, not deleted
//! - Unreadable, unparsable or checksum-mismatched entries are misses
//! - Writes are atomic (write to .tmp, rename into place) and always overwrite

use crate::domain::{Bar, BarSeries};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures while writing. Reads never fail; they degrade to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(String),

    #[error("cache serialization error: {0}")]
    Serialize(String),
}

/// Exact cache key. Dates only, so time-of-day never affects matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            start,
            end,
        }
    }

    /// `{SYMBOL}_{YYYYMMDD}_{YYYYMMDD}.json`, with characters that are not
    /// filename-safe in the symbol replaced by `_`.
    pub fn file_name(&self) -> String {
        let symbol: String = self
            .symbol
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{symbol}_{}_{}.json",
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

/// Persisted record for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: Vec<Bar>,
    pub cached_at: DateTime<Utc>,
    /// blake3 of the JSON-serialized bars.
    pub checksum: String,
}

impl CacheEntry {
    pub fn new(
        key: &CacheKey,
        series: &BarSeries,
        cached_at: DateTime<Utc>,
    ) -> Result<Self, CacheError> {
        let bars = series.bars().to_vec();
        let checksum = checksum_of(&bars)?;
        Ok(Self {
            symbol: key.symbol.clone(),
            start: key.start,
            end: key.end,
            bars,
            cached_at,
            checksum,
        })
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.symbol, self.start, self.end)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.cached_at) > ttl
    }

    fn is_intact(&self) -> bool {
        checksum_of(&self.bars).is_ok_and(|c| c == self.checksum)
    }

    fn into_series(self) -> BarSeries {
        BarSeries::new(self.symbol, self.bars)
    }
}

fn checksum_of(bars: &[Bar]) -> Result<String, CacheError> {
    let bytes = serde_json::to_vec(bars).map_err(|e| CacheError::Serialize(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Lookup/store contract the data manager depends on.
///
/// Not atomic across a lookup-miss → fetch → store sequence: two concurrent
/// misses for one key may both fetch, and the later store wins.
pub trait CacheStore: Send + Sync {
    /// Fresh, intact series for the exact key, or `None`.
    fn lookup(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<BarSeries>;

    /// Write (or overwrite) the entry for the key, stamped with the current time.
    fn store(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        series: &BarSeries,
    ) -> Result<(), CacheError>;
}

/// One JSON file per key.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    cache_dir: PathBuf,
    ttl: TimeDelta,
}

impl JsonFileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl: TimeDelta::days(1),
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Path of the entry file for a key.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// Write a prepared entry verbatim (including its `cached_at`).
    pub fn write_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| CacheError::Io(format!("failed to create dir: {e}")))?;

        let path = self.entry_path(&entry.key());
        let tmp_path = path.with_extension("json.tmp");
        let json =
            serde_json::to_vec(entry).map_err(|e| CacheError::Serialize(e.to_string()))?;

        fs::write(&tmp_path, json)
            .map_err(|e| CacheError::Io(format!("failed to write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CacheError::Io(format!("atomic rename failed: {e}"))
        })?;
        Ok(())
    }

    /// Read and verify an entry file. `None` for anything unusable.
    fn read_entry(path: &Path) -> Option<CacheEntry> {
        let content = fs::read(path).ok()?;
        let entry: CacheEntry = match serde_json::from_slice(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                return None;
            }
        };
        if !entry.is_intact() {
            warn!(path = %path.display(), "ignoring cache entry with checksum mismatch");
            return None;
        }
        Some(entry)
    }

    /// Summaries of every entry file in the cache directory, sorted by file name.
    pub fn entries(&self) -> Vec<CacheSummary> {
        let now = Utc::now();
        let mut summaries: Vec<CacheSummary> = self
            .entry_files()
            .into_iter()
            .map(|path| match Self::read_entry(&path) {
                Some(entry) => CacheSummary {
                    stale: entry.is_stale(now, self.ttl),
                    symbol: Some(entry.symbol),
                    start: Some(entry.start),
                    end: Some(entry.end),
                    bar_count: entry.bars.len(),
                    cached_at: Some(entry.cached_at),
                    corrupt: false,
                    path,
                },
                None => CacheSummary {
                    path,
                    symbol: None,
                    start: None,
                    end: None,
                    bar_count: 0,
                    cached_at: None,
                    stale: false,
                    corrupt: true,
                },
            })
            .collect();
        summaries.sort_by(|a, b| a.path.cmp(&b.path));
        summaries
    }

    /// Delete stale and corrupt entry files. Returns the number removed.
    pub fn purge_stale(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for summary in self.entries() {
            if summary.stale || summary.corrupt {
                fs::remove_file(&summary.path).map_err(|e| {
                    CacheError::Io(format!("failed to remove {}: {e}", summary.path.display()))
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        dir.filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect()
    }
}

impl CacheStore for JsonFileCache {
    fn lookup(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<BarSeries> {
        let key = CacheKey::new(symbol, start, end);
        let path = self.entry_path(&key);
        if !path.exists() {
            debug!(symbol, %start, %end, "cache miss");
            return None;
        }

        let entry = Self::read_entry(&path)?;
        // Sanitised file names can collide; the stored key is authoritative.
        if entry.key() != key {
            debug!(symbol, %start, %end, "cache key mismatch, treating as miss");
            return None;
        }
        if entry.is_stale(Utc::now(), self.ttl) {
            debug!(symbol, cached_at = %entry.cached_at, "cache entry stale");
            return None;
        }

        debug!(symbol, %start, %end, rows = entry.bars.len(), "cache hit");
        Some(entry.into_series())
    }

    fn store(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        series: &BarSeries,
    ) -> Result<(), CacheError> {
        let key = CacheKey::new(symbol, start, end);
        let entry = CacheEntry::new(&key, series, Utc::now())?;
        self.write_entry(&entry)
    }
}

/// Status of a single entry file.
#[derive(Debug, Clone)]
pub struct CacheSummary {
    pub path: PathBuf,
    pub symbol: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub bar_count: usize,
    pub cached_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub corrupt: bool,
}

/// In-process map with the same TTL semantics. Handy for tests and for
/// hosts that don't want anything on disk.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: TimeDelta,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: TimeDelta::days(1),
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Insert a prepared entry verbatim (including its `cached_at`).
    pub fn insert_entry(&self, entry: CacheEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(entry.key(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn lookup(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<BarSeries> {
        let key = CacheKey::new(symbol, start, end);
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&key)?;
        if entry.is_stale(Utc::now(), self.ttl) {
            return None;
        }
        Some(entry.clone().into_series())
    }

    fn store(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        series: &BarSeries,
    ) -> Result<(), CacheError> {
        let key = CacheKey::new(symbol, start, end);
        let entry = CacheEntry::new(&key, series, Utc::now())?;
        self.insert_entry(entry);
        Ok(())
    }
}
