//! BarSeries — ordered daily bars for exactly one symbol.

use super::bar::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered sequence of daily bars for one symbol.
///
/// Construction sorts by timestamp but keeps duplicates, so that
/// `DataManager::validate` can still reject them. Series are never mutated
/// in place; transformations build new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Vec::new())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// True when timestamps are strictly increasing (sorted and unique).
    pub fn is_strictly_increasing(&self) -> bool {
        self.bars
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// First and last trading dates, if any bars exist.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.first()?.date(), self.last()?.date()))
    }
}
