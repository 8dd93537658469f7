//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2/(window+1).
//! Seed: EMA[0] = close[0]. The first window-1 values are masked to NaN even
//! though the recursion runs through them.
//! Lookback: window - 1.

use super::rolling::{ewm, span_alpha};
use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone)]
pub struct Ema {
    window: usize,
}

impl Ema {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "EMA window must be >= 1");
        Self { window }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        ema_of_series(frame.close(), self.window)
    }
}

/// EMA of an arbitrary column with the same seeding and masking rules.
/// Leading NaNs are skipped, so the average starts at the first valid value.
/// Used by MACD for both the price EMAs and the signal line.
pub fn ema_of_series(values: &[f64], window: usize) -> Vec<f64> {
    ewm(values, span_alpha(window), window)
}
