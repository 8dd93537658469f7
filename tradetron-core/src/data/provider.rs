//! Quote provider trait and structured error types.
//!
//! The QuoteProvider trait abstracts over bar sources (Polygon, the synthetic
//! generator, test doubles) so the data manager can be driven by any of them.

use crate::domain::{BarSeries, Ticker};
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for data acquisition.
///
/// Designed to be displayable in CLI contexts. Nothing in the data layer
/// retries on these; they are surfaced to the caller as-is.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network-level failure: connection refused, DNS, timeout, truncated body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered but reported failure (non-OK envelope,
    /// missing results, non-success HTTP status, undecodable payload).
    #[error("provider error: {0}")]
    Provider(String),

    /// A throttle wait was cancelled before the rate limiter admitted the call.
    #[error("request cancelled while waiting for rate limiter")]
    Cancelled,

    /// Context wrapper added by the data manager.
    #[error("error fetching data for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: Box<DataError>,
    },
}

impl DataError {
    pub fn for_symbol(self, symbol: &str) -> Self {
        DataError::Fetch {
            symbol: symbol.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through symbol context wrappers.
    pub fn root(&self) -> &DataError {
        match self {
            DataError::Fetch { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Trait for quote providers.
///
/// Implementations handle the specifics of fetching data from a particular
/// source. The cache layer sits above this trait; providers don't know about it.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch reference metadata for a symbol.
    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, DataError>;

    /// Fetch daily OHLCV bars for a symbol over an inclusive date range.
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        adjusted: bool,
    ) -> Result<BarSeries, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_context_in_message() {
        let err = DataError::Provider("NOT_FOUND".into()).for_symbol("ZZZZ");
        let msg = err.to_string();
        assert!(msg.contains("ZZZZ"));
        assert!(msg.contains("NOT_FOUND"));
        assert!(matches!(err.root(), DataError::Provider(_)));
    }
}
