//! Data manager: cache-first orchestration over a quote provider.
//!
//! ```text
//! get_daily_data(symbol, start, end, use_cache)
//!   ├─ use_cache && cache hit ──────────────► return cached series
//!   └─ provider.fetch_daily_bars ─┬─ Err ──► DataError::Fetch { symbol, .. }
//!                                 └─ Ok ───► store (if use_cache) ─► return
//! ```
//!
//! There is no stale-on-error fallback: a provider failure is returned even
//! when an expired cache entry for the same key exists.

use super::cache::CacheStore;
use super::provider::{DataError, QuoteProvider};
use crate::domain::{BarSeries, Ticker};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-request knobs beyond the date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub use_cache: bool,
    /// Split/dividend adjusted prices. Unadjusted requests bypass the cache,
    /// whose key does not distinguish the two.
    pub adjusted: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            adjusted: true,
        }
    }
}

pub struct DataManager {
    provider: Arc<dyn QuoteProvider>,
    cache: Arc<dyn CacheStore>,
}

impl DataManager {
    pub fn new(provider: Arc<dyn QuoteProvider>, cache: Arc<dyn CacheStore>) -> Self {
        Self { provider, cache }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Adjusted daily bars for `[start, end]`, served from cache when allowed.
    pub fn get_daily_data(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        use_cache: bool,
    ) -> Result<BarSeries, DataError> {
        self.get_daily_bars(
            symbol,
            start,
            end,
            FetchOptions {
                use_cache,
                ..FetchOptions::default()
            },
        )
    }

    pub fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        options: FetchOptions,
    ) -> Result<BarSeries, DataError> {
        let cacheable = options.use_cache && options.adjusted;

        if cacheable {
            if let Some(series) = self.cache.lookup(symbol, start, end) {
                debug!(symbol, rows = series.len(), "serving bars from cache");
                return Ok(series);
            }
        }

        let series = self
            .provider
            .fetch_daily_bars(symbol, start, end, options.adjusted)
            .map_err(|e| e.for_symbol(symbol))?;
        info!(
            symbol,
            provider = self.provider.name(),
            rows = series.len(),
            "fetched daily bars"
        );

        if cacheable {
            if let Err(e) = self.cache.store(symbol, start, end, &series) {
                warn!(symbol, error = %e, "failed to write cache entry");
            }
        }
        Ok(series)
    }

    /// Ticker reference data. Always fetched, never cached.
    pub fn get_ticker_info(&self, symbol: &str) -> Result<Ticker, DataError> {
        self.provider
            .fetch_ticker(symbol)
            .map_err(|e| e.for_symbol(symbol))
    }

    /// Pre-flight quality gate for the feature engine.
    pub fn validate(&self, series: &BarSeries) -> bool {
        validate(series)
    }
}

/// False when the series is empty, any OHLCV value is missing or non-finite,
/// any price is not positive, any volume is negative, or a timestamp repeats.
pub fn validate(series: &BarSeries) -> bool {
    if series.is_empty() {
        debug!(symbol = series.symbol(), "validation failed: empty series");
        return false;
    }

    for bar in series.bars() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        let non_finite = prices.iter().chain([&bar.volume]).any(|v| !v.is_finite());
        let reason = if bar.is_void() || non_finite {
            "missing value"
        } else if prices.iter().any(|&p| p <= 0.0) {
            "non-positive price"
        } else if bar.volume < 0.0 {
            "negative volume"
        } else {
            continue;
        };
        debug!(symbol = series.symbol(), date = %bar.date(), reason, "validation failed");
        return false;
    }

    // Construction sorts, so repeats are adjacent.
    if !series.is_strictly_increasing() {
        debug!(symbol = series.symbol(), "validation failed: duplicate timestamps");
        return false;
    }
    true
}
