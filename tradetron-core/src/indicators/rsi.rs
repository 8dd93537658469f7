//! Relative Strength Index (RSI).
//!
//! Wilder smoothing (alpha = 1/window) of gains and losses from close-to-close
//! changes. A change that cannot be computed (row 0, or next to a missing
//! close) counts as zero movement, so the averages start at row 0 and the
//! first value appears at row window-1.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss); avg_loss == 0 → RSI = 100.
//! Lookback: window - 1.

use super::rolling::{diff, ewm};
use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "RSI window must be >= 1");
        Self { window }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        let changes = diff(frame.close());
        // NaN comparisons are false, so missing changes land on 0.0.
        let gains: Vec<f64> = changes
            .iter()
            .map(|&c| if c > 0.0 { c } else { 0.0 })
            .collect();
        let losses: Vec<f64> = changes
            .iter()
            .map(|&c| if c < 0.0 { -c } else { 0.0 })
            .collect();

        let alpha = 1.0 / self.window as f64;
        let avg_gain = ewm(&gains, alpha, self.window);
        let avg_loss = ewm(&losses, alpha, self.window);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| compute_rsi(g, l))
            .collect()
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
