//! Data acquisition: providers, rate limiting, caching and orchestration.

pub mod cache;
pub mod download;
pub mod manager;
pub mod polygon;
pub mod provider;
pub mod rate_limiter;
pub mod synthetic;

pub use cache::{
    CacheEntry, CacheError, CacheKey, CacheStore, CacheSummary, JsonFileCache, MemoryCache,
};
pub use download::{
    download_symbols, DownloadProgress, DownloadSummary, SilentProgress, SymbolOutcome,
};
pub use manager::{validate, DataManager, FetchOptions};
pub use polygon::{AggregateRange, PolygonClient, Timespan};
pub use provider::{DataError, QuoteProvider};
pub use rate_limiter::RateLimiter;
pub use synthetic::SyntheticProvider;
