//! EnrichedSeries — retained OHLCV rows plus named computed columns.

use super::frame::PriceFrame;
use chrono::{DateTime, Utc};

/// Output of the feature engine. Every computed column has one value per
/// retained row and none of them are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedSeries {
    frame: PriceFrame,
    columns: Vec<(String, Vec<f64>)>,
    dropped_rows: usize,
}

impl EnrichedSeries {
    pub(crate) fn new(
        frame: PriceFrame,
        columns: Vec<(String, Vec<f64>)>,
        dropped_rows: usize,
    ) -> Self {
        Self {
            frame,
            columns,
            dropped_rows,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.frame.symbol()
    }

    /// Retained OHLCV rows.
    pub fn frame(&self) -> &PriceFrame {
        &self.frame
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        self.frame.timestamps()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Number of input rows removed for having a NaN in a computed column.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Computed column names, in computation order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// A computed column, or one of the base OHLCV columns.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .or_else(|| self.frame.column(name))
    }

    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name)?.get(row).copied()
    }

    pub(crate) fn columns(&self) -> &[(String, Vec<f64>)] {
        &self.columns
    }
}
