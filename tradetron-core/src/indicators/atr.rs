//! True Range and Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! TR[0] = high[0] - low[0] (no previous close).
//! ATR is the trailing simple mean of TR over `window` rows (not Wilder).
//! Lookback: 0 for TR, window - 1 for ATR.

use super::rolling::rolling_mean;
use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone, Default)]
pub struct TrueRange;

impl Indicator for TrueRange {
    fn name(&self) -> &str {
        "true_range"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        true_range(frame)
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    window: usize,
}

impl Atr {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "ATR window must be >= 1");
        Self { window }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        rolling_mean(&true_range(frame), self.window)
    }
}

/// Compute the True Range column.
pub fn true_range(frame: &PriceFrame) -> Vec<f64> {
    let (high, low, close) = (frame.high(), frame.low(), frame.close());
    (0..frame.len())
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                return hl;
            }
            let pc = close[i - 1];
            if pc.is_nan() {
                // Missing previous close: fall back to the intraday range.
                return hl;
            }
            hl.max((high[i] - pc).abs()).max((low[i] - pc).abs())
        })
        .collect()
}
