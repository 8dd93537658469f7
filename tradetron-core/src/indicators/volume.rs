//! Volume features: trailing mean volume and the ratio of volume to it.
//! Lookback: window - 1 for both.

use super::rolling::rolling_mean;
use super::Indicator;
use crate::features::PriceFrame;

#[derive(Debug, Clone)]
pub struct VolumeMa {
    window: usize,
}

impl VolumeMa {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume MA window must be >= 1");
        Self { window }
    }
}

impl Indicator for VolumeMa {
    fn name(&self) -> &str {
        "volume_ma"
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        rolling_mean(frame.volume(), self.window)
    }
}

/// volume / trailing mean volume. Zero mean volume gives NaN.
#[derive(Debug, Clone)]
pub struct VolumeRatio {
    window: usize,
}

impl VolumeRatio {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume ratio window must be >= 1");
        Self { window }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        "volume_ratio"
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, frame: &PriceFrame) -> Vec<f64> {
        frame
            .volume()
            .iter()
            .zip(rolling_mean(frame.volume(), self.window))
            .map(|(&v, ma)| if ma == 0.0 { f64::NAN } else { v / ma })
            .collect()
    }
}
