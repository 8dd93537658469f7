//! Technical indicators and price-derived features.
//!
//! Every indicator is a pure function of a `PriceFrame`: full columns in,
//! one output column of the same length out. Multi-output indicators
//! (Bollinger, MACD, stochastic) are exposed as separate named instances per
//! output column, keeping the single-column `Indicator` trait unchanged.
//!
//! Trailing windows need `window` non-missing rows. Exponential averages are
//! seeded with the first value and masked until `window` rows have been seen.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod returns;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod spec;
pub mod stochastic;
pub mod volume;
pub mod vwap;

pub use atr::{Atr, TrueRange};
pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use macd::{Macd, MacdOutput};
pub use returns::{LogReturns, PriceChange, PriceChangePct, Returns};
pub use rsi::Rsi;
pub use sma::Sma;
pub use spec::{IndicatorConfig, IndicatorKind, IndicatorParams, IndicatorSpec, SpecError};
pub use stochastic::{Stochastic, StochasticLine};
pub use volume::{VolumeMa, VolumeRatio};
pub use vwap::Vwap;

use crate::features::PriceFrame;

/// Trait for indicators.
///
/// Indicators take the full frame and produce a numeric column of the same
/// length. The first `lookback()` values are `f64::NAN` (warm-up).
///
/// # Look-ahead contamination guard
/// No value at row t may depend on data from row t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Output column name (e.g. "sma", "bb_high").
    fn name(&self) -> &str;

    /// Number of leading rows that are NaN on clean input.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire frame.
    fn compute(&self, frame: &PriceFrame) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Frame over `make_bars(closes)`.
#[cfg(test)]
pub fn make_frame(closes: &[f64]) -> PriceFrame {
    frame_of(make_bars(closes))
}

#[cfg(test)]
pub fn frame_of(bars: Vec<crate::domain::Bar>) -> PriceFrame {
    PriceFrame::from(&crate::domain::BarSeries::new("TEST", bars))
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
