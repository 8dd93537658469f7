//! Bar — the fundamental market data unit.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol on a single day.
///
/// `timestamp` is always UTC midnight of the trading date. Prices are
/// adjusted or raw depending on how the series was requested. A missing
/// value from the provider is carried as `f64::NAN` (a "void" field), which
/// is why `volume` is a float as well: the provider reports it as a JSON
/// number and split-adjusted volumes can be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<u64>,
}

impl Bar {
    /// Build a bar stamped at UTC midnight of `date`.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp: midnight_utc(date),
            open,
            high,
            low,
            close,
            volume,
            vwap: None,
            transactions: None,
        }
    }

    /// Trading date of the bar.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Returns true if any OHLCV field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLCV sanity check: high >= max(open, close), low <= min(open, close),
    /// strictly positive prices.
    ///
    /// Not enforced anywhere in the pipeline; correct upstream data satisfies it.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }
}

/// UTC midnight of a calendar date.
pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Convert provider epoch milliseconds to UTC midnight of the UTC calendar date.
///
/// Returns `None` for timestamps outside chrono's representable range.
pub fn day_from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).map(|dt| midnight_utc(dt.date_naive()))
}
