//! Columnar OHLCV input for the feature engine.
//!
//! The engine works on `PriceFrame`, a struct of parallel column vectors.
//! Anything that can produce one implements `OhlcvSource`: a `BarSeries`
//! always can, a Polars `DataFrame` can when it carries the required columns.

use crate::domain::bar::midnight_utc;
use crate::domain::BarSeries;
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use thiserror::Error;

pub const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Input does not have the shape the engine needs.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("null timestamp at row {0}")]
    NullTimestamp(usize),
}

/// Parallel OHLCV columns. All vectors have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFrame {
    symbol: Option<String>,
    timestamps: Vec<DateTime<Utc>>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl PriceFrame {
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// Base column by name (`open`, `high`, `low`, `close`, `volume`).
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "open" => Some(&self.open),
            "high" => Some(&self.high),
            "low" => Some(&self.low),
            "close" => Some(&self.close),
            "volume" => Some(&self.volume),
            _ => None,
        }
    }

    /// First `n` rows. Used to check that nothing depends on later rows.
    pub fn head(&self, n: usize) -> PriceFrame {
        let n = n.min(self.len());
        PriceFrame {
            symbol: self.symbol.clone(),
            timestamps: self.timestamps[..n].to_vec(),
            open: self.open[..n].to_vec(),
            high: self.high[..n].to_vec(),
            low: self.low[..n].to_vec(),
            close: self.close[..n].to_vec(),
            volume: self.volume[..n].to_vec(),
        }
    }

    /// Rows where `keep[i]` is true, order preserved.
    pub fn filter(&self, keep: &[bool]) -> PriceFrame {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        PriceFrame {
            symbol: self.symbol.clone(),
            timestamps: pick(&self.timestamps, keep),
            open: pick(&self.open, keep),
            high: pick(&self.high, keep),
            low: pick(&self.low, keep),
            close: pick(&self.close, keep),
            volume: pick(&self.volume, keep),
        }
    }
}

impl From<&BarSeries> for PriceFrame {
    fn from(series: &BarSeries) -> Self {
        let bars = series.bars();
        PriceFrame {
            symbol: Some(series.symbol().to_string()),
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
            volume: bars.iter().map(|b| b.volume).collect(),
        }
    }
}

/// Anything the feature engine can read OHLCV columns from.
pub trait OhlcvSource {
    fn to_price_frame(&self) -> Result<PriceFrame, SchemaError>;
}

impl OhlcvSource for PriceFrame {
    fn to_price_frame(&self) -> Result<PriceFrame, SchemaError> {
        Ok(self.clone())
    }
}

impl OhlcvSource for BarSeries {
    fn to_price_frame(&self) -> Result<PriceFrame, SchemaError> {
        Ok(PriceFrame::from(self))
    }
}

/// Requires a `timestamp` column (Date or Datetime) and numeric
/// `open`, `high`, `low`, `close`, `volume` columns. Nulls in value columns
/// become NaN. Row order is taken as-is.
impl OhlcvSource for DataFrame {
    fn to_price_frame(&self) -> Result<PriceFrame, SchemaError> {
        for name in std::iter::once(TIMESTAMP_COLUMN).chain(REQUIRED_COLUMNS) {
            if self.column(name).is_err() {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }

        Ok(PriceFrame {
            symbol: None,
            timestamps: timestamp_values(self)?,
            open: numeric_values(self, "open")?,
            high: numeric_values(self, "high")?,
            low: numeric_values(self, "low")?,
            close: numeric_values(self, "close")?,
            volume: numeric_values(self, "volume")?,
        })
    }
}

// ── DataFrame column readers ────────────────────────────────────────

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn column_of<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, SchemaError> {
    df.column(name)
        .map_err(|_| SchemaError::MissingColumn(name.to_string()))
}

fn mismatch(name: &str, expected: &str, actual: &DataType) -> SchemaError {
    SchemaError::TypeMismatch {
        column: name.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, SchemaError> {
    let column = column_of(df, name)?;
    let dtype = column.dtype().clone();
    if !is_numeric(&dtype) {
        return Err(mismatch(name, "numeric", &dtype));
    }

    let cast = column
        .cast(&DataType::Float64)
        .map_err(|_| mismatch(name, "numeric", &dtype))?;
    let values = cast.f64().map_err(|_| mismatch(name, "numeric", &dtype))?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn timestamp_values(df: &DataFrame) -> Result<Vec<DateTime<Utc>>, SchemaError> {
    let column = column_of(df, TIMESTAMP_COLUMN)?;
    let dtype = column.dtype().clone();

    match dtype {
        DataType::Date => {
            let epoch = NaiveDate::default();
            let dates = column
                .date()
                .map_err(|_| mismatch(TIMESTAMP_COLUMN, "Date or Datetime", &dtype))?;
            (0..column.len())
                .map(|i| {
                    let days = dates.get(i).ok_or(SchemaError::NullTimestamp(i))?;
                    let date = epoch + chrono::Duration::days(i64::from(days));
                    Ok(midnight_utc(date))
                })
                .collect()
        }
        DataType::Datetime(_, _) => {
            let millis = column
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .map_err(|_| mismatch(TIMESTAMP_COLUMN, "Date or Datetime", &dtype))?;
            let values = millis
                .datetime()
                .map_err(|_| mismatch(TIMESTAMP_COLUMN, "Date or Datetime", &dtype))?;
            (0..column.len())
                .map(|i| {
                    values
                        .get(i)
                        .and_then(DateTime::from_timestamp_millis)
                        .map(|dt| midnight_utc(dt.date_naive()))
                        .ok_or(SchemaError::NullTimestamp(i))
                })
                .collect()
        }
        other => Err(mismatch(TIMESTAMP_COLUMN, "Date or Datetime", &other)),
    }
}
