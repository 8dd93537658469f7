//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - `bb_mid`: SMA(close, window)
//! - `bb_high`: mid + window_dev * stddev(close, window)
//! - `bb_low`: mid - window_dev * stddev(close, window)
//!
//! Uses population stddev (divide by N).
//! Lookback: window - 1.

use super::rolling::{rolling_mean, rolling_std};
use super::Indicator;
use crate::features::PriceFrame;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

impl BollingerBand {
    pub fn column(self) -> &'static str {
        match self {
            BollingerBand::Upper => "bb_high",
            BollingerBand::Middle => "bb_mid",
            BollingerBand::Lower => "bb_low",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: usize,
    window_dev: f64,
    band: BollingerBand,
}

impl Bollinger {
    pub fn new(window: usize, window_dev: f64, band: BollingerBand) -> Self {
        assert!(window >= 1, "Bollinger window must be >= 1");
        Self {
            window,
            window_dev,
            band,
        }
    }

    pub fn upper(window: usize, window_dev: f64) -> Self {
        Self::new(window, window_dev, BollingerBand::Upper)
    }

    pub fn middle(window: usize, window_dev: f64) -> Self {
        Self::new(window, window_dev, BollingerBand::Middle)
    }

    pub fn lower(window: usize, window_dev: f64) -> Self {
        Self::new(window, window_dev, BollingerBand::Lower)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        self.band.column()
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        let mean = rolling_mean(frame.close(), self.window);
        let sign = match self.band {
            BollingerBand::Middle => return mean,
            BollingerBand::Upper => 1.0,
            BollingerBand::Lower => -1.0,
        };
        let std = rolling_std(frame.close(), self.window);
        mean.iter()
            .zip(&std)
            .map(|(m, s)| m + sign * self.window_dev * s)
            .collect()
    }
}
