//! Tradetron Core — daily bar acquisition, caching, validation and enrichment.
//!
//! This crate contains the data pipeline:
//! - Domain types (bars, bar series, ticker metadata)
//! - Immutable, validated configuration
//! - Rate-limited Polygon client behind the `QuoteProvider` trait
//! - Bar cache keyed by exact (symbol, start, end)
//! - Cache-first data manager with a boolean validation gate
//! - Indicator and price-feature engine with columnar export

pub mod config;
pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;

pub use config::{ConfigError, DataConfig};
pub use data::{DataError, DataManager};
pub use domain::{Bar, BarSeries, Ticker};
pub use features::{process, EnrichedSeries, ProcessOptions};
pub use indicators::IndicatorSpec;
