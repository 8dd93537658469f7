//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: window - 1 (first valid value at index window-1).

use super::rolling::rolling_mean;
use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "SMA window must be >= 1");
        Self { window }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        rolling_mean(frame.close(), self.window)
    }
}
