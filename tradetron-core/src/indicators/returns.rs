//! Price-derived return features.
//!
//! - `returns`: close[t] / close[t-1] - 1
//! - `log_returns`: ln(close[t]) - ln(close[t-1])
//! - `price_change`: close - open (same row)
//! - `price_change_pct`: (close - open) / open
//!
//! Lookback: 1 for the close-to-close features, 0 for the intraday ones.

use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone, Default)]
pub struct Returns;

#[derive(Debug, Clone, Default)]
pub struct LogReturns;

#[derive(Debug, Clone, Default)]
pub struct PriceChange;

#[derive(Debug, Clone, Default)]
pub struct PriceChangePct;

/// f(close[t-1], close[t]); NaN at row 0.
fn close_to_close(frame: &PriceFrame, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    let close = frame.close();
    let mut result = vec![f64::NAN; close.len()];
    for i in 1..close.len() {
        result[i] = f(close[i - 1], close[i]);
    }
    result
}

impl Indicator for Returns {
    fn name(&self) -> &str {
        "returns"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        close_to_close(frame, |prev, curr| curr / prev - 1.0)
    }
}

impl Indicator for LogReturns {
    fn name(&self) -> &str {
        "log_returns"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        close_to_close(frame, |prev, curr| curr.ln() - prev.ln())
    }
}

impl Indicator for PriceChange {
    fn name(&self) -> &str {
        "price_change"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        frame
            .close()
            .iter()
            .zip(frame.open())
            .map(|(c, o)| c - o)
            .collect()
    }
}

impl Indicator for PriceChangePct {
    fn name(&self) -> &str {
        "price_change_pct"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        frame
            .close()
            .iter()
            .zip(frame.open())
            .map(|(c, o)| (c - o) / o)
            .collect()
    }
}
