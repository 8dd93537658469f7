//! Data-layer configuration.
//!
//! Loaded once at startup and immutable afterwards. Precedence, lowest first:
//! built-in defaults, an optional TOML file, then environment variables
//! (a `.env` file in the working directory is honoured).
//!
//! ```toml
//! [polygon]
//! base_url = "https://api.polygon.io"
//! calls_per_minute = 5
//!
//! [cache]
//! dir = "data/cache"
//! ttl_hours = 24
//! ```

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
pub const DEFAULT_CALLS_PER_MINUTE: u32 = 5;
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

pub const ENV_API_KEY: &str = "POLYGON_API_KEY";
pub const ENV_BASE_URL: &str = "POLYGON_BASE_URL";
pub const ENV_RATE_LIMIT: &str = "POLYGON_RATE_LIMIT_PER_MINUTE";
pub const ENV_CACHE_DIR: &str = "TRADETRON_CACHE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("POLYGON_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("calls per minute must be at least 1")]
    ZeroRateLimit,

    #[error("cache TTL must be positive")]
    NonPositiveTtl,

    #[error("cache TTL of {0} hours is out of range")]
    TtlOutOfRange(i64),

    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// Validated, immutable data-layer configuration.
pub struct DataConfig {
    api_key: SecretString,
    base_url: String,
    calls_per_minute: u32,
    cache_dir: PathBuf,
    cache_ttl: TimeDelta,
}

impl fmt::Debug for DataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("calls_per_minute", &self.calls_per_minute)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl DataConfig {
    pub fn builder(api_key: impl Into<String>) -> DataConfigBuilder {
        DataConfigBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            calls_per_minute: DEFAULT_CALLS_PER_MINUTE,
            cache_dir: default_cache_dir(),
            cache_ttl: TimeDelta::hours(DEFAULT_CACHE_TTL_HOURS),
        }
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Defaults, then the TOML file at `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(p) => ConfigFile::read(p)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Merge a parsed file with an environment lookup. Split out so the
    /// precedence rules are testable without touching the real environment.
    fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = env(ENV_API_KEY)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut builder = Self::builder(api_key);

        if let Some(url) = file.polygon.base_url {
            builder = builder.base_url(url);
        }
        if let Some(calls) = file.polygon.calls_per_minute {
            builder = builder.calls_per_minute(calls);
        }
        if let Some(dir) = file.cache.dir {
            builder = builder.cache_dir(dir);
        }
        if let Some(hours) = file.cache.ttl_hours {
            let ttl = TimeDelta::try_hours(hours).ok_or(ConfigError::TtlOutOfRange(hours))?;
            builder = builder.cache_ttl(ttl);
        }

        if let Some(url) = env(ENV_BASE_URL) {
            builder = builder.base_url(url);
        }
        if let Some(raw) = env(ENV_RATE_LIMIT) {
            let calls = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_RATE_LIMIT.to_string(),
                value: raw.clone(),
            })?;
            builder = builder.calls_per_minute(calls);
        }
        if let Some(dir) = env(ENV_CACHE_DIR) {
            builder = builder.cache_dir(dir);
        }

        builder.build()
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn calls_per_minute(&self) -> u32 {
        self.calls_per_minute
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_ttl(&self) -> TimeDelta {
        self.cache_ttl
    }
}

/// Builder for programmatic construction; `build` runs the same validation
/// as the file/env loaders.
#[derive(Debug, Clone)]
pub struct DataConfigBuilder {
    api_key: String,
    base_url: String,
    calls_per_minute: u32,
    cache_dir: PathBuf,
    cache_ttl: TimeDelta,
}

impl DataConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn calls_per_minute(mut self, calls: u32) -> Self {
        self.calls_per_minute = calls;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn cache_ttl(mut self, ttl: TimeDelta) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<DataConfig, ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.calls_per_minute == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if self.cache_ttl <= TimeDelta::zero() {
            return Err(ConfigError::NonPositiveTtl);
        }

        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url,
                reason: "scheme must be http or https".into(),
            });
        }

        Ok(DataConfig {
            api_key: SecretString::new(self.api_key.into()),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            calls_per_minute: self.calls_per_minute,
            cache_dir: self.cache_dir,
            cache_ttl: self.cache_ttl,
        })
    }
}

/// `<user cache dir>/tradetron`, or `data/cache` when the platform has none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("tradetron"))
        .unwrap_or_else(|| PathBuf::from("data").join("cache"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    polygon: PolygonSection,
    #[serde(default)]
    cache: CacheSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolygonSection {
    base_url: Option<String>,
    calls_per_minute: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    dir: Option<PathBuf>,
    ttl_hours: Option<i64>,
}

impl ConfigFile {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
