//! Volume-Weighted Average Price over the typical price (high + low + close) / 3.
//!
//! Cumulative from the first row by default; with a window, a trailing sum
//! of `window` rows. Rows where the summed volume is zero are NaN.
//! Lookback: 0 cumulative, window - 1 rolling.

use super::rolling::rolling_sum;
use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone)]
pub struct Vwap {
    window: Option<usize>,
}

impl Vwap {
    pub fn cumulative() -> Self {
        Self { window: None }
    }

    pub fn rolling(window: usize) -> Self {
        assert!(window >= 1, "VWAP window must be >= 1");
        Self {
            window: Some(window),
        }
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn lookback(&self) -> usize {
        self.window.map_or(0, |w| w - 1)
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        let pv: Vec<f64> = (0..frame.len())
            .map(|i| {
                let typical = (frame.high()[i] + frame.low()[i] + frame.close()[i]) / 3.0;
                typical * frame.volume()[i]
            })
            .collect();

        let (pv_sum, vol_sum) = match self.window {
            Some(w) => (rolling_sum(&pv, w), rolling_sum(frame.volume(), w)),
            None => (cumulative_sum(&pv), cumulative_sum(frame.volume())),
        };

        pv_sum
            .iter()
            .zip(&vol_sum)
            .map(|(&p, &v)| if v == 0.0 { f64::NAN } else { p / v })
            .collect()
    }
}

/// Running sum; once a NaN is seen every later value is NaN.
fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}
