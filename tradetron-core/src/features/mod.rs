//! Feature engineering: columnar input, the enrichment engine and export.

pub mod engine;
pub mod enriched;
pub mod export;
pub mod frame;

pub use engine::{price_features, process, ProcessOptions, ATR_WINDOW, VOLUME_MA_WINDOW};
pub use enriched::EnrichedSeries;
pub use export::ExportError;
pub use frame::{OhlcvSource, PriceFrame, SchemaError};
