//! Moving Average Convergence/Divergence (MACD).
//!
//! Three outputs (separate Indicator instances):
//! - `macd`: EMA(close, fast) - EMA(close, slow)
//! - `macd_signal`: EMA(macd, signal), started at the first valid MACD row
//! - `macd_diff`: macd - macd_signal
//!
//! Lookback: slow - 1 for the line, slow + signal - 2 for signal and diff.

use super::ema::ema_of_series;
use super::Indicator;
use crate::features::PriceFrame;

/// Which MACD output column to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdOutput {
    Line,
    Signal,
    Histogram,
}

impl MacdOutput {
    pub fn column(self) -> &'static str {
        match self {
            MacdOutput::Line => "macd",
            MacdOutput::Signal => "macd_signal",
            MacdOutput::Histogram => "macd_diff",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdOutput,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, output: MacdOutput) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD windows must be >= 1");
        assert!(fast < slow, "MACD fast window must be shorter than slow window");
        Self {
            fast,
            slow,
            signal,
            output,
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdOutput::Line)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdOutput::Signal)
    }

    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdOutput::Histogram)
    }

    fn macd_line(&self, close: &[f64]) -> Vec<f64> {
        let fast = ema_of_series(close, self.fast);
        let slow = ema_of_series(close, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        self.output.column()
    }

    fn lookback(&self) -> usize {
        match self.output {
            MacdOutput::Line => self.slow - 1,
            MacdOutput::Signal | MacdOutput::Histogram => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        let line = self.macd_line(frame.close());
        if self.output == MacdOutput::Line {
            return line;
        }

        let signal = ema_of_series(&line, self.signal);
        match self.output {
            MacdOutput::Histogram => line.iter().zip(&signal).map(|(m, s)| m - s).collect(),
            _ => signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_frame, DEFAULT_EPSILON};

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.7).sin()).collect()
    }

    #[test]
    fn default_warmups() {
        let frame = make_frame(&ramp(60));
        let line = Macd::line(12, 26, 9).compute(&frame);
        let signal = Macd::signal(12, 26, 9).compute(&frame);
        let diff = Macd::histogram(12, 26, 9).compute(&frame);

        assert!(line[24].is_nan());
        assert!(!line[25].is_nan());
        assert!(signal[32].is_nan());
        assert!(!signal[33].is_nan());
        assert!(diff[32].is_nan());
        assert!(!diff[33].is_nan());
        assert_eq!(Macd::signal(12, 26, 9).lookback(), 33);
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let frame = make_frame(&ramp(50));
        let line = Macd::line(3, 6, 4).compute(&frame);
        let signal = Macd::signal(3, 6, 4).compute(&frame);
        let diff = Macd::histogram(3, 6, 4).compute(&frame);
        for i in 8..50 {
            assert_approx(diff[i], line[i] - signal[i], DEFAULT_EPSILON);
        }
    }

    #[test]
    fn signal_seeded_from_first_valid_line_value() {
        let frame = make_frame(&ramp(20));
        let line = Macd::line(2, 4, 3).compute(&frame);
        let signal = Macd::signal(2, 4, 3).compute(&frame);
        // Line valid from 3; signal seeds there and is valid from 3 + 2.
        let alpha = 2.0 / 4.0;
        let mut expected = line[3];
        expected = alpha * line[4] + (1.0 - alpha) * expected;
        expected = alpha * line[5] + (1.0 - alpha) * expected;
        assert!(signal[4].is_nan());
        assert_approx(signal[5], expected, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_price_macd_is_zero() {
        let frame = make_frame(&[42.0; 40]);
        let line = Macd::line(12, 26, 9).compute(&frame);
        assert_approx(line[30], 0.0, DEFAULT_EPSILON);
    }
}
