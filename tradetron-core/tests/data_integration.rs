//! Integration tests for the data pipeline: data manager orchestration over a
//! counting mock provider, and the JSON file cache on a temp directory.

use chrono::{NaiveDate, TimeDelta, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tradetron_core::data::{
    download_symbols, CacheEntry, CacheKey, CacheStore, DataError, DataManager, FetchOptions,
    JsonFileCache, MemoryCache, QuoteProvider, SilentProgress, SyntheticProvider,
};
use tradetron_core::domain::{Bar, BarSeries, Ticker};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn sample_series(symbol: &str) -> BarSeries {
    BarSeries::new(
        symbol,
        vec![
            Bar::new(d(2024, 1, 2), 100.0, 102.0, 99.0, 101.0, 1000.0),
            Bar::new(d(2024, 1, 3), 101.0, 103.0, 100.0, 102.0, 1100.0),
            Bar::new(d(2024, 1, 4), 102.0, 104.0, 101.0, 103.5, 900.0),
        ],
    )
}

// ── Mock provider ────────────────────────────────────────────────────

/// Provider that counts calls and either serves `sample_series` or fails.
struct MockProvider {
    calls: AtomicUsize,
    adjusted_seen: Mutex<Vec<bool>>,
    fail_with: Option<fn() -> DataError>,
}

impl MockProvider {
    fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            adjusted_seen: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    fn failing(f: fn() -> DataError) -> Self {
        Self {
            fail_with: Some(f),
            ..Self::ok()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QuoteProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        SyntheticProvider::default().fetch_ticker(symbol)
    }

    fn fetch_daily_bars(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        adjusted: bool,
    ) -> Result<BarSeries, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.adjusted_seen.lock().unwrap().push(adjusted);
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        Ok(sample_series(symbol))
    }
}

/// Cache whose writes always fail; lookups always miss.
struct BrokenCache;

impl CacheStore for BrokenCache {
    fn lookup(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Option<BarSeries> {
        None
    }

    fn store(
        &self,
        _: &str,
        _: NaiveDate,
        _: NaiveDate,
        _: &BarSeries,
    ) -> Result<(), tradetron_core::data::CacheError> {
        Err(tradetron_core::data::CacheError::Io("disk full".into()))
    }
}

fn manager(provider: &Arc<MockProvider>, cache: Arc<dyn CacheStore>) -> DataManager {
    DataManager::new(provider.clone(), cache)
}

// ── Data manager orchestration ───────────────────────────────────────

#[test]
fn second_request_is_served_from_cache() {
    let provider = Arc::new(MockProvider::ok());
    let mgr = manager(&provider, Arc::new(MemoryCache::new()));

    let first = mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), true).unwrap();
    let second = mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), true).unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.calls(), 1);
}

#[test]
fn different_range_is_a_miss() {
    let provider = Arc::new(MockProvider::ok());
    let mgr = manager(&provider, Arc::new(MemoryCache::new()));

    mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), true).unwrap();
    mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 2, 1), true).unwrap();
    assert_eq!(provider.calls(), 2);
}

#[test]
fn cache_disabled_always_fetches_and_never_stores() {
    let provider = Arc::new(MockProvider::ok());
    let cache = Arc::new(MemoryCache::new());
    let mgr = manager(&provider, cache.clone());

    mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), false).unwrap();
    mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), false).unwrap();
    assert_eq!(provider.calls(), 2);
    assert!(cache.is_empty());
}

#[test]
fn unadjusted_requests_bypass_cache() {
    let provider = Arc::new(MockProvider::ok());
    let cache = Arc::new(MemoryCache::new());
    let mgr = manager(&provider, cache.clone());
    let options = FetchOptions {
        use_cache: true,
        adjusted: false,
    };

    mgr.get_daily_bars("SPY", d(2024, 1, 1), d(2024, 1, 31), options).unwrap();
    assert!(cache.is_empty());
    assert_eq!(*provider.adjusted_seen.lock().unwrap(), vec![false]);
}

#[test]
fn provider_error_is_wrapped_with_symbol() {
    let provider = Arc::new(MockProvider::failing(|| {
        DataError::Provider("NOT_AUTHORIZED".into())
    }));
    let mgr = manager(&provider, Arc::new(MemoryCache::new()));

    let err = mgr
        .get_daily_data("ZZZZ", d(2024, 1, 1), d(2024, 1, 31), true)
        .unwrap_err();
    assert!(matches!(&err, DataError::Fetch { symbol, .. } if symbol == "ZZZZ"));
    assert!(matches!(err.root(), DataError::Provider(_)));
    assert!(err.to_string().contains("NOT_AUTHORIZED"));
}

#[test]
fn stale_entry_is_not_used_as_fallback() {
    let provider = Arc::new(MockProvider::failing(|| DataError::Transport("refused".into())));
    let cache = Arc::new(MemoryCache::new());
    let key = CacheKey::new("SPY", d(2024, 1, 1), d(2024, 1, 31));
    cache.insert_entry(
        CacheEntry::new(&key, &sample_series("SPY"), Utc::now() - TimeDelta::days(3)).unwrap(),
    );
    let mgr = manager(&provider, cache);

    let err = mgr
        .get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), true)
        .unwrap_err();
    assert!(matches!(err.root(), DataError::Transport(_)));
}

#[test]
fn failed_cache_write_still_returns_data() {
    let provider = Arc::new(MockProvider::ok());
    let mgr = manager(&provider, Arc::new(BrokenCache));
    let series = mgr.get_daily_data("SPY", d(2024, 1, 1), d(2024, 1, 31), true).unwrap();
    assert_eq!(series.len(), 3);
}

#[test]
fn ticker_info_is_never_cached() {
    let provider = Arc::new(MockProvider::ok());
    let mgr = manager(&provider, Arc::new(MemoryCache::new()));
    assert_eq!(mgr.get_ticker_info("AAPL").unwrap().symbol, "AAPL");
    mgr.get_ticker_info("AAPL").unwrap();
    assert_eq!(provider.calls(), 2);
}

// ── JSON file cache ──────────────────────────────────────────────────

#[test]
fn file_cache_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = JsonFileCache::new(dir.path());
    let series = sample_series("SPY");

    cache.store("SPY", d(2024, 1, 1), d(2024, 1, 31), &series).unwrap();

    assert!(dir.path().join("SPY_20240101_20240131.json").exists());
    assert_eq!(cache.lookup("SPY", d(2024, 1, 1), d(2024, 1, 31)), Some(series));
    assert!(cache.lookup("SPY", d(2024, 1, 2), d(2024, 1, 31)).is_none());
}

#[test]
fn file_cache_store_overwrites() {
    let dir = TempDir::new().unwrap();
    let cache = JsonFileCache::new(dir.path());
    cache.store("SPY", d(2024, 1, 1), d(2024, 1, 31), &sample_series("SPY")).unwrap();

    let shorter = BarSeries::new("SPY", sample_series("SPY").into_bars()[..1].to_vec());
    cache.store("SPY", d(2024, 1, 1), d(2024, 1, 31), &shorter).unwrap();
    assert_eq!(cache.lookup("SPY", d(2024, 1, 1), d(2024, 1, 31)), Some(shorter));
}

#[test]
fn file_cache_stale_entry_is_miss_but_not_deleted() {
    let dir = TempDir::new().unwrap();
    let cache = JsonFileCache::new(dir.path());
    let key = CacheKey::new("SPY", d(2024, 1, 1), d(2024, 1, 31));
    let stamped = Utc::now() - TimeDelta::hours(25);
    let old = CacheEntry::new(&key, &sample_series("SPY"), stamped).unwrap();
    cache.write_entry(&old).unwrap();

    assert!(cache.lookup("SPY", d(2024, 1, 1), d(2024, 1, 31)).is_none());
    assert!(cache.entry_path(&key).exists());

    // A longer TTL makes the same entry usable again.
    let lenient = JsonFileCache::new(dir.path()).with_ttl(TimeDelta::days(2));
    assert!(lenient.lookup("SPY", d(2024, 1, 1), d(2024, 1, 31)).is_some());
}

#[test]
fn file_cache_corrupt_entries_are_misses() {
    let dir = TempDir::new().unwrap();
    let cache = JsonFileCache::new(dir.path());
    let key = CacheKey::new("SPY", d(2024, 1, 1), d(2024, 1, 31));

    std::fs::write(cache.entry_path(&key), b"{ not json").unwrap();
    assert!(cache.lookup("SPY", d(2024, 1, 1), d(2024, 1, 31)).is_none());

    // Valid JSON, tampered bars: checksum mismatch.
    let mut entry = CacheEntry::new(&key, &sample_series("SPY"), Utc::now()).unwrap();
    entry.bars[1].close = 1.0;
    cache.write_entry(&entry).unwrap();
    assert!(cache.lookup("SPY", d(2024, 1, 1), d(2024, 1, 31)).is_none());
}

#[test]
fn file_cache_entries_and_purge() {
    let dir = TempDir::new().unwrap();
    let cache = JsonFileCache::new(dir.path());
    cache.store("SPY", d(2024, 1, 1), d(2024, 1, 31), &sample_series("SPY")).unwrap();

    let old_key = CacheKey::new("QQQ", d(2024, 1, 1), d(2024, 1, 31));
    cache
        .write_entry(
            &CacheEntry::new(&old_key, &sample_series("QQQ"), Utc::now() - TimeDelta::days(5))
                .unwrap(),
        )
        .unwrap();
    std::fs::write(dir.path().join("BAD_20240101_20240131.json"), b"garbage").unwrap();

    let entries = cache.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries.iter().filter(|e| e.stale).count(), 1);
    assert_eq!(entries.iter().filter(|e| e.corrupt).count(), 1);

    assert_eq!(cache.purge_stale().unwrap(), 2);
    let remaining = cache.entries();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].symbol.as_deref(), Some("SPY"));
    assert_eq!(remaining[0].bar_count, 3);
}

#[test]
fn file_cache_missing_dir_is_empty() {
    let dir = TempDir::new().unwrap();
    let cache = JsonFileCache::new(dir.path().join("nope"));
    assert!(cache.entries().is_empty());
    assert!(cache.lookup("SPY", d(2024, 1, 1), d(2024, 1, 2)).is_none());
}

// ── Batch download ───────────────────────────────────────────────────

#[test]
fn download_collects_per_symbol_results() {
    let provider = Arc::new(SyntheticProvider::new(3));
    let mgr = DataManager::new(provider, Arc::new(MemoryCache::new()));
    let symbols: Vec<String> = ["SPY", "QQQ", "IWM"].iter().map(|s| s.to_string()).collect();

    let summary = download_symbols(
        &mgr,
        &symbols,
        d(2024, 1, 1),
        d(2024, 3, 31),
        FetchOptions::default(),
        &SilentProgress,
    );
    assert_eq!(summary.total, 3);
    assert!(summary.all_succeeded());
    let names: Vec<&str> = summary.succeeded.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(names, vec!["SPY", "QQQ", "IWM"]);
}

#[test]
fn download_reports_failures_without_aborting() {
    let provider = Arc::new(MockProvider::failing(|| DataError::Transport("down".into())));
    let mgr = manager(&provider, Arc::new(MemoryCache::new()));
    let symbols = vec!["SPY".to_string(), "QQQ".to_string()];

    let summary = download_symbols(
        &mgr,
        &symbols,
        d(2024, 1, 1),
        d(2024, 1, 31),
        FetchOptions::default(),
        &SilentProgress,
    );
    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary.invalid.is_empty());
    assert_eq!(provider.calls(), 2);
}

/// Serves a series with a negative volume: the fetch succeeds, validation fails.
struct NegativeVolumeProvider;

impl QuoteProvider for NegativeVolumeProvider {
    fn name(&self) -> &str {
        "negative-volume"
    }

    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, DataError> {
        SyntheticProvider::default().fetch_ticker(symbol)
    }

    fn fetch_daily_bars(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _adjusted: bool,
    ) -> Result<BarSeries, DataError> {
        let mut bars = sample_series(symbol).into_bars();
        bars[1].volume = -5.0;
        Ok(BarSeries::new(symbol, bars))
    }
}

#[test]
fn download_separates_invalid_series_from_fetch_errors() {
    let mgr = DataManager::new(Arc::new(NegativeVolumeProvider), Arc::new(MemoryCache::new()));
    let symbols = vec!["SPY".to_string()];

    let summary = download_symbols(
        &mgr,
        &symbols,
        d(2024, 1, 1),
        d(2024, 1, 31),
        FetchOptions::default(),
        &SilentProgress,
    );
    assert!(!summary.all_succeeded());
    assert!(summary.errors.is_empty());
    assert_eq!(summary.invalid, vec![("SPY".to_string(), 3)]);
    assert_eq!(summary.failed(), 1);
}
