//! Ticker reference data.

use serde::{Deserialize, Serialize};

/// Reference metadata for a listed security.
///
/// Field names follow the provider's wire format so the type deserializes
/// straight from the ticker-details payload. Fetched on demand, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(rename = "ticker")]
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub locale: String,
    #[serde(default)]
    pub primary_exchange: String,
    #[serde(rename = "type", default)]
    pub security_type: String,
    pub active: bool,
    #[serde(rename = "currency_name", default)]
    pub currency: String,
    #[serde(default)]
    pub cik: Option<String>,
    #[serde(default)]
    pub composite_figi: Option<String>,
    #[serde(default)]
    pub share_class_figi: Option<String>,
    #[serde(default)]
    pub last_updated_utc: Option<String>,
}
