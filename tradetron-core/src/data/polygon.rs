//! Polygon.io quote provider.
//!
//! Fetches ticker details (`/v3/reference/tickers/{symbol}`) and aggregate
//! bars (`/v2/aggs/ticker/{symbol}/range/{multiplier}/{timespan}/{from}/{to}`)
//! over bearer-authenticated HTTPS. Every request first passes the shared
//! rate limiter, which blocks until the rolling window admits it. There is no
//! retry: transport and provider failures go straight back to the caller.

use super::provider::{DataError, QuoteProvider};
use super::rate_limiter::RateLimiter;
use crate::config::DataConfig;
use crate::domain::bar::day_from_epoch_millis;
use crate::domain::{Bar, BarSeries, Ticker};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Common response envelope. `results` is an object for ticker details and
/// an array for aggregates.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Option<String>,
    results: Option<T>,
    error: Option<String>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    /// Provider-supplied failure text, if any.
    fn reason(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// One aggregate bar on the wire.
#[derive(Debug, Deserialize)]
struct AggBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    #[serde(default)]
    vw: Option<f64>,
    #[serde(default)]
    n: Option<u64>,
    t: i64,
}

/// Date-granular aggregate timespans. Intraday spans are not offered because
/// bars are stamped by calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timespan {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Timespan {
    pub fn as_str(self) -> &'static str {
        match self {
            Timespan::Day => "day",
            Timespan::Week => "week",
            Timespan::Month => "month",
            Timespan::Quarter => "quarter",
            Timespan::Year => "year",
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size of each aggregate bucket, e.g. `1 day` or `2 week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRange {
    pub multiplier: u32,
    pub timespan: Timespan,
}

impl AggregateRange {
    pub const DAILY: Self = Self {
        multiplier: 1,
        timespan: Timespan::Day,
    };
}

/// Polygon.io REST client.
pub struct PolygonClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: SecretString,
    limiter: Arc<RateLimiter>,
}

impl fmt::Debug for PolygonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolygonClient")
            .field("base_url", &self.base_url)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl PolygonClient {
    /// Client with its own limiter sized from `config`.
    pub fn new(config: &DataConfig) -> Result<Self, DataError> {
        let limiter = Arc::new(RateLimiter::per_minute(config.calls_per_minute()));
        Self::with_limiter(config, limiter)
    }

    /// Client sharing an existing limiter, so several clients (or threads)
    /// draw from one quota.
    pub fn with_limiter(config: &DataConfig, limiter: Arc<RateLimiter>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tradetron/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: SecretString::new(config.api_key().into()),
            limiter,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Build the ticker-details URL.
    fn ticker_url(&self, symbol: &str) -> String {
        format!("{}/v3/reference/tickers/{symbol}", self.base_url)
    }

    /// Build the aggregates URL for a symbol, bucket size and date range.
    fn aggregates_url(
        &self,
        symbol: &str,
        range: AggregateRange,
        start: NaiveDate,
        end: NaiveDate,
    ) -> String {
        format!(
            "{}/v2/aggs/ticker/{symbol}/range/{}/{}/{}/{}",
            self.base_url,
            range.multiplier,
            range.timespan,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        )
    }

    /// Throttled GET returning the decoded envelope.
    fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Envelope<T>, DataError> {
        self.limiter.acquire();
        debug!(url, "GET");

        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .map_err(|e| DataError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| DataError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.reason().map(str::to_string))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string()
                });
            return Err(DataError::Provider(format!("HTTP {}: {reason}", status.as_u16())));
        }

        serde_json::from_str(&body)
            .map_err(|e| DataError::Provider(format!("malformed response: {e}")))
    }

    /// Fetch aggregate bars of any date-granular bucket size.
    pub fn fetch_aggregates(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        range: AggregateRange,
        adjusted: bool,
    ) -> Result<BarSeries, DataError> {
        let url = self.aggregates_url(symbol, range, start, end);
        let adjusted = if adjusted { "true" } else { "false" };
        let envelope: Envelope<Vec<AggBar>> = self.get(&url, &[("adjusted", adjusted)])?;

        let bars = parse_aggregates(envelope)?;
        info!(symbol, rows = bars.len(), %start, %end, "fetched aggregates");
        Ok(BarSeries::new(symbol, bars))
    }
}

impl QuoteProvider for PolygonClient {
    fn name(&self) -> &str {
        "polygon"
    }

    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, DataError> {
        let envelope: Envelope<Ticker> = self.get(&self.ticker_url(symbol), &[])?;
        ensure_ok(&envelope, "error fetching ticker details")?;
        envelope
            .results
            .ok_or_else(|| DataError::Provider("ticker details response has no results".into()))
    }

    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        adjusted: bool,
    ) -> Result<BarSeries, DataError> {
        self.fetch_aggregates(symbol, start, end, AggregateRange::DAILY, adjusted)
    }
}

/// Reject any envelope whose status is not exactly "OK".
fn ensure_ok<T>(envelope: &Envelope<T>, context: &str) -> Result<(), DataError> {
    match envelope.status.as_deref() {
        Some("OK") => Ok(()),
        other => Err(DataError::Provider(format!(
            "{context}: {}",
            envelope
                .reason()
                .or(other)
                .unwrap_or("response has no status")
        ))),
    }
}

/// Translate an aggregates envelope into bars.
fn parse_aggregates(envelope: Envelope<Vec<AggBar>>) -> Result<Vec<Bar>, DataError> {
    ensure_ok(&envelope, "error fetching aggregates")?;
    let results = envelope
        .results
        .ok_or_else(|| DataError::Provider("error fetching aggregates: No results found".into()))?;

    results
        .into_iter()
        .map(|agg| {
            let timestamp = day_from_epoch_millis(agg.t).ok_or_else(|| {
                DataError::Provider(format!("invalid bar timestamp: {}", agg.t))
            })?;
            Ok(Bar {
                timestamp,
                open: agg.o,
                high: agg.h,
                low: agg.l,
                close: agg.c,
                volume: agg.v,
                vwap: agg.vw,
                transactions: agg.n,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PolygonClient {
        let config = DataConfig::builder("test-key")
            .base_url("http://localhost:9")
            .build()
            .unwrap();
        PolygonClient::new(&config).unwrap()
    }

    fn parse(json: &str) -> Result<Vec<Bar>, DataError> {
        parse_aggregates(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn aggregates_url_shape() {
        let url = client().aggregates_url(
            "AAPL",
            AggregateRange::DAILY,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost:9/v2/aggs/ticker/AAPL/range/1/day/2024-01-02/2024-02-29"
        );
    }

    #[test]
    fn ticker_url_shape() {
        assert_eq!(
            client().ticker_url("TSLA"),
            "http://localhost:9/v3/reference/tickers/TSLA"
        );
    }

    #[test]
    fn parses_ok_aggregates() {
        let bars = parse(
            r#"{"ticker":"AAPL","status":"OK","resultsCount":2,"results":[
                {"v":70790813,"vw":131.6292,"o":130.465,"c":130.15,"h":133.41,"l":129.89,"t":1673240400000,"n":645365},
                {"v":63896155,"o":130.26,"c":131.67,"h":131.85,"l":128.36,"t":1673326800000}
            ]}"#,
        )
        .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date(), NaiveDate::from_ymd_opt(2023, 1, 9).unwrap());
        assert_eq!(bars[0].open, 130.465);
        assert_eq!(bars[0].volume, 70_790_813.0);
        assert_eq!(bars[0].vwap, Some(131.6292));
        assert_eq!(bars[0].transactions, Some(645_365));
        assert_eq!(bars[1].vwap, None);
        assert_eq!(bars[1].date(), NaiveDate::from_ymd_opt(2023, 1, 10).unwrap());
    }

    #[test]
    fn non_ok_status_is_provider_error() {
        let err = parse(r#"{"status":"ERROR","error":"Unknown API Key"}"#).unwrap_err();
        match err {
            DataError::Provider(msg) => assert!(msg.contains("Unknown API Key")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn delayed_status_is_provider_error() {
        let err = parse(r#"{"status":"DELAYED","results":[]}"#).unwrap_err();
        match err {
            DataError::Provider(msg) => assert!(msg.contains("DELAYED")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn missing_results_is_provider_error() {
        let err = parse(r#"{"status":"OK","resultsCount":0}"#).unwrap_err();
        match err {
            DataError::Provider(msg) => assert!(msg.contains("No results found")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn empty_results_is_empty_series() {
        assert!(parse(r#"{"status":"OK","results":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn timespan_names() {
        assert_eq!(Timespan::Day.to_string(), "day");
        assert_eq!(Timespan::Quarter.as_str(), "quarter");
    }
}
