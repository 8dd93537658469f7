//! Columnar export of enriched series (Polars DataFrame, CSV, Parquet).
//!
//! Column layout: `timestamp`, `open`, `high`, `low`, `close`, `volume`,
//! then the computed columns in computation order.

use super::enriched::EnrichedSeries;
use super::frame::{REQUIRED_COLUMNS, TIMESTAMP_COLUMN};
use chrono::SecondsFormat;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O error: {0}")]
    Io(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Parquet error: {0}")]
    Parquet(String),
}

impl EnrichedSeries {
    /// Base and computed columns as a DataFrame. Timestamps are
    /// millisecond `Datetime` values in UTC.
    pub fn to_dataframe(&self) -> Result<DataFrame, ExportError> {
        let millis: Vec<i64> = self
            .timestamps()
            .iter()
            .map(|t| t.timestamp_millis())
            .collect();

        let mut columns = vec![Column::new(TIMESTAMP_COLUMN.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| ExportError::Parquet(format!("timestamp cast: {e}")))?];
        for name in REQUIRED_COLUMNS {
            let values = self.frame().column(name).unwrap_or_default().to_vec();
            columns.push(Column::new(name.into(), values));
        }
        for (name, values) in self.columns() {
            columns.push(Column::new(name.as_str().into(), values.clone()));
        }

        DataFrame::new(columns)
            .map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))
    }

    /// Write a CSV with a header row. Timestamps are RFC 3339 (UTC).
    pub fn write_csv(&self, path: &Path) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_path(path)
            .map_err(|e| ExportError::Csv(format!("create {}: {e}", path.display())))?;

        let mut header: Vec<&str> = vec![TIMESTAMP_COLUMN];
        header.extend(REQUIRED_COLUMNS);
        header.extend(self.names());
        wtr.write_record(&header)
            .map_err(|e| ExportError::Csv(e.to_string()))?;

        for row in 0..self.len() {
            let stamp = self.timestamps()[row].to_rfc3339_opts(SecondsFormat::Secs, true);
            let mut record = vec![stamp];
            for name in &header[1..] {
                record.push(self.value(name, row).unwrap_or(f64::NAN).to_string());
            }
            wtr.write_record(&record)
                .map_err(|e| ExportError::Csv(e.to_string()))?;
        }

        wtr.flush().map_err(|e| ExportError::Io(e.to_string()))?;
        Ok(())
    }

    /// Write a Parquet file atomically (temp file, then rename).
    pub fn write_parquet(&self, path: &Path) -> Result<(), ExportError> {
        let mut df = self.to_dataframe()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ExportError::Io(format!("create dir: {e}")))?;
        }

        let tmp_path = path.with_extension("parquet.tmp");
        let file = fs::File::create(&tmp_path)
            .map_err(|e| ExportError::Io(format!("create {}: {e}", tmp_path.display())))?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                ExportError::Parquet(format!("write: {e}"))
            })?;

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ExportError::Io(format!("atomic rename failed: {e}"))
        })?;
        Ok(())
    }
}
