//! Stochastic oscillator.
//!
//! - `stoch_k` = 100 * (close - min(low, window)) / (max(high, window) - min(low, window))
//! - `stoch_d` = SMA(stoch_k, smooth_window)
//!
//! A window with zero range has no defined %K and yields NaN.
//! Lookback: window - 1 for %K, window + smooth_window - 2 for %D.

use super::rolling::{rolling_max, rolling_mean, rolling_min};
use super::Indicator;
use crate::features::PriceFrame;

/// Which stochastic line to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticLine {
    K,
    D,
}

impl StochasticLine {
    pub fn column(self) -> &'static str {
        match self {
            StochasticLine::K => "stoch_k",
            StochasticLine::D => "stoch_d",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    window: usize,
    smooth_window: usize,
    line: StochasticLine,
}

impl Stochastic {
    pub fn new(window: usize, smooth_window: usize, line: StochasticLine) -> Self {
        assert!(window >= 1, "stochastic window must be >= 1");
        assert!(smooth_window >= 1, "stochastic smooth window must be >= 1");
        Self {
            window,
            smooth_window,
            line,
        }
    }

    pub fn k(window: usize, smooth_window: usize) -> Self {
        Self::new(window, smooth_window, StochasticLine::K)
    }

    pub fn d(window: usize, smooth_window: usize) -> Self {
        Self::new(window, smooth_window, StochasticLine::D)
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        self.line.column()
    }

    fn lookback(&self) -> usize {
        match self.line {
            StochasticLine::K => self.window - 1,
            StochasticLine::D => self.window + self.smooth_window - 2,
        }
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        let lowest = rolling_min(frame.low(), self.window);
        let highest = rolling_max(frame.high(), self.window);

        let k: Vec<f64> = frame
            .close()
            .iter()
            .zip(lowest.iter().zip(&highest))
            .map(|(&c, (&lo, &hi))| {
                let range = hi - lo;
                if range == 0.0 {
                    f64::NAN
                } else {
                    100.0 * (c - lo) / range
                }
            })
            .collect();

        match self.line {
            StochasticLine::K => k,
            StochasticLine::D => rolling_mean(&k, self.smooth_window),
        }
    }
}
