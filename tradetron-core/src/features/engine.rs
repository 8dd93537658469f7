//! Feature engine: computes the selected indicators plus price-derived
//! features over a whole frame, then drops every row that has a NaN in any
//! computed column.
//!
//! Each output column is computed independently from the full input, using
//! only past and current rows. The engine does not validate prices; run
//! `DataManager::validate` first.

use super::enriched::EnrichedSeries;
use super::frame::{OhlcvSource, SchemaError};
use crate::indicators::{
    Atr, Indicator, IndicatorSpec, LogReturns, PriceChange, PriceChangePct, Returns, TrueRange,
    VolumeMa, VolumeRatio,
};
use tracing::debug;

pub const ATR_WINDOW: usize = 14;
pub const VOLUME_MA_WINDOW: usize = 20;

/// What `process` computes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOptions {
    pub compute_indicators: bool,
    pub compute_features: bool,
    pub indicators: IndicatorSpec,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            compute_indicators: true,
            compute_features: true,
            indicators: IndicatorSpec::default(),
        }
    }
}

impl ProcessOptions {
    pub fn with_indicators(mut self, indicators: IndicatorSpec) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn without_indicators(mut self) -> Self {
        self.compute_indicators = false;
        self
    }

    pub fn without_features(mut self) -> Self {
        self.compute_features = false;
        self
    }

    /// Indicator instances in output column order: spec indicators first,
    /// then price features.
    pub fn build(&self) -> Vec<Box<dyn Indicator>> {
        let mut all = Vec::new();
        if self.compute_indicators {
            all.extend(self.indicators.build());
        }
        if self.compute_features {
            all.extend(price_features());
        }
        all
    }

    /// Largest warm-up among the selected columns. On clean input this is
    /// exactly the number of rows `process` drops.
    pub fn max_lookback(&self) -> usize {
        self.build().iter().map(|i| i.lookback()).max().unwrap_or(0)
    }
}

/// The fixed set of price-derived features.
pub fn price_features() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Returns),
        Box::new(LogReturns),
        Box::new(PriceChange),
        Box::new(PriceChangePct),
        Box::new(TrueRange),
        Box::new(Atr::new(ATR_WINDOW)),
        Box::new(VolumeMa::new(VOLUME_MA_WINDOW)),
        Box::new(VolumeRatio::new(VOLUME_MA_WINDOW)),
    ]
}

/// Enrich `source` with the columns selected by `options`.
///
/// Fails only when the source lacks the OHLCV columns.
pub fn process<S: OhlcvSource + ?Sized>(
    source: &S,
    options: &ProcessOptions,
) -> Result<EnrichedSeries, SchemaError> {
    let frame = source.to_price_frame()?;

    let columns: Vec<(String, Vec<f64>)> = options
        .build()
        .iter()
        .map(|ind| (ind.name().to_string(), ind.compute(&frame)))
        .collect();

    let keep: Vec<bool> = (0..frame.len())
        .map(|row| columns.iter().all(|(_, values)| !values[row].is_nan()))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();

    let retained: Vec<(String, Vec<f64>)> = columns
        .into_iter()
        .map(|(name, values)| {
            let kept = values
                .into_iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v)
                .collect();
            (name, kept)
        })
        .collect();

    debug!(
        symbol = frame.symbol().unwrap_or("-"),
        rows = frame.len(),
        dropped,
        columns = retained.len(),
        "computed features"
    );

    Ok(EnrichedSeries::new(frame.filter(&keep), retained, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_frame, IndicatorConfig};

    fn linear(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn default_lookback_is_macd_signal() {
        assert_eq!(ProcessOptions::default().max_lookback(), 33);
    }

    #[test]
    fn features_only_drop_volume_ma_warmup() {
        let options = ProcessOptions::default().without_indicators();
        let out = process(&make_frame(&linear(30)), &options).unwrap();
        assert_eq!(out.len(), 11);
        assert_eq!(out.dropped_rows(), 19);
        assert_eq!(
            out.names(),
            vec![
                "returns",
                "log_returns",
                "price_change",
                "price_change_pct",
                "true_range",
                "atr",
                "volume_ma",
                "volume_ratio"
            ]
        );
    }

    #[test]
    fn nothing_selected_keeps_every_row() {
        let options = ProcessOptions::default()
            .without_indicators()
            .without_features();
        let out = process(&make_frame(&linear(5)), &options).unwrap();
        assert_eq!(out.len(), 5);
        assert!(out.names().is_empty());
    }

    #[test]
    fn short_input_yields_empty_series() {
        let out = process(&make_frame(&linear(10)), &ProcessOptions::default()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.dropped_rows(), 10);
    }

    #[test]
    fn custom_spec_changes_warmup() {
        let spec = IndicatorSpec::empty()
            .with(IndicatorConfig::Sma { window: 5 })
            .unwrap();
        let options = ProcessOptions::default()
            .with_indicators(spec)
            .without_features();
        let out = process(&make_frame(&linear(12)), &options).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(out.value("sma", 0), Some(102.0));
    }
}
