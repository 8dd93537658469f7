//! Indicator selection: which indicators to compute and with what windows.
//!
//! A spec is an ordered list of indicator configurations, at most one per
//! kind. It can be built in code, parsed from a compact string
//!
//! ```text
//! sma:window=50;rsi;macd:window_fast=8,window_slow=21
//! ```
//!
//! or deserialized from a map (TOML table / JSON object) keyed by indicator:
//!
//! ```toml
//! [indicators]
//! sma = { window = 50 }
//! rsi = {}
//! ```
//!
//! Unrecognised indicator keys are skipped. Unknown or inapplicable
//! parameters on a recognised key are errors.

use super::{Bollinger, Ema, Indicator, Macd, Rsi, Sma, Stochastic, Vwap};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    #[error("{indicator}: {param} must be at least 1")]
    ZeroWindow {
        indicator: &'static str,
        param: &'static str,
    },

    #[error("macd: window_fast ({fast}) must be less than window_slow ({slow})")]
    FastNotBelowSlow { fast: usize, slow: usize },

    #[error("bbands: window_dev must be finite and non-negative, got {0}")]
    InvalidDeviation(f64),

    #[error("{indicator} does not take parameter '{param}'")]
    UnsupportedParameter {
        indicator: &'static str,
        param: String,
    },

    #[error("invalid indicator spec '{input}': {reason}")]
    Parse { input: String, reason: String },
}

/// Supported indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Bbands,
    Macd,
    Stoch,
    Vwap,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Rsi,
        IndicatorKind::Bbands,
        IndicatorKind::Macd,
        IndicatorKind::Stoch,
        IndicatorKind::Vwap,
    ];

    pub fn key(self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Bbands => "bbands",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Stoch => "stoch",
            IndicatorKind::Vwap => "vwap",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw, optional parameters as they appear in a spec. Which ones apply
/// depends on the indicator kind; missing ones take the kind's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_dev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_fast: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_slow: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_sign: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth_window: Option<usize>,
}

impl IndicatorParams {
    /// Names of the parameters that are set.
    fn provided(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.window.is_some() {
            names.push("window");
        }
        if self.window_dev.is_some() {
            names.push("window_dev");
        }
        if self.window_fast.is_some() {
            names.push("window_fast");
        }
        if self.window_slow.is_some() {
            names.push("window_slow");
        }
        if self.window_sign.is_some() {
            names.push("window_sign");
        }
        if self.smooth_window.is_some() {
            names.push("smooth_window");
        }
        names
    }

    /// Set one parameter from its textual form.
    fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        fn int(value: &str) -> Result<usize, String> {
            value
                .parse()
                .map_err(|_| format!("'{value}' is not a non-negative integer"))
        }
        match name {
            "window" => self.window = Some(int(value)?),
            "window_fast" => self.window_fast = Some(int(value)?),
            "window_slow" => self.window_slow = Some(int(value)?),
            "window_sign" => self.window_sign = Some(int(value)?),
            "smooth_window" => self.smooth_window = Some(int(value)?),
            "window_dev" => {
                self.window_dev = Some(
                    value
                        .parse()
                        .map_err(|_| format!("'{value}' is not a number"))?,
                )
            }
            other => return Err(format!("unknown parameter '{other}'")),
        }
        Ok(())
    }
}

/// A fully resolved, validated indicator configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorConfig {
    Sma { window: usize },
    Ema { window: usize },
    Rsi { window: usize },
    Bbands { window: usize, window_dev: f64 },
    Macd { window_fast: usize, window_slow: usize, window_sign: usize },
    Stoch { window: usize, smooth_window: usize },
    /// `None` is cumulative from the first row.
    Vwap { window: Option<usize> },
}

impl IndicatorConfig {
    pub fn default_for(kind: IndicatorKind) -> Self {
        match kind {
            IndicatorKind::Sma => IndicatorConfig::Sma { window: 20 },
            IndicatorKind::Ema => IndicatorConfig::Ema { window: 20 },
            IndicatorKind::Rsi => IndicatorConfig::Rsi { window: 14 },
            IndicatorKind::Bbands => IndicatorConfig::Bbands {
                window: 20,
                window_dev: 2.0,
            },
            IndicatorKind::Macd => IndicatorConfig::Macd {
                window_fast: 12,
                window_slow: 26,
                window_sign: 9,
            },
            IndicatorKind::Stoch => IndicatorConfig::Stoch {
                window: 14,
                smooth_window: 3,
            },
            IndicatorKind::Vwap => IndicatorConfig::Vwap { window: None },
        }
    }

    /// Defaults for `kind` overridden by `params`, then validated.
    pub fn from_params(kind: IndicatorKind, params: &IndicatorParams) -> Result<Self, SpecError> {
        let accepted: &[&str] = match kind {
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::Rsi | IndicatorKind::Vwap => {
                &["window"]
            }
            IndicatorKind::Bbands => &["window", "window_dev"],
            IndicatorKind::Macd => &["window_fast", "window_slow", "window_sign"],
            IndicatorKind::Stoch => &["window", "smooth_window"],
        };
        if let Some(bad) = params.provided().into_iter().find(|p| !accepted.contains(p)) {
            return Err(SpecError::UnsupportedParameter {
                indicator: kind.key(),
                param: bad.to_string(),
            });
        }

        let config = match Self::default_for(kind) {
            IndicatorConfig::Sma { window } => IndicatorConfig::Sma {
                window: params.window.unwrap_or(window),
            },
            IndicatorConfig::Ema { window } => IndicatorConfig::Ema {
                window: params.window.unwrap_or(window),
            },
            IndicatorConfig::Rsi { window } => IndicatorConfig::Rsi {
                window: params.window.unwrap_or(window),
            },
            IndicatorConfig::Bbands { window, window_dev } => IndicatorConfig::Bbands {
                window: params.window.unwrap_or(window),
                window_dev: params.window_dev.unwrap_or(window_dev),
            },
            IndicatorConfig::Macd {
                window_fast,
                window_slow,
                window_sign,
            } => IndicatorConfig::Macd {
                window_fast: params.window_fast.unwrap_or(window_fast),
                window_slow: params.window_slow.unwrap_or(window_slow),
                window_sign: params.window_sign.unwrap_or(window_sign),
            },
            IndicatorConfig::Stoch {
                window,
                smooth_window,
            } => IndicatorConfig::Stoch {
                window: params.window.unwrap_or(window),
                smooth_window: params.smooth_window.unwrap_or(smooth_window),
            },
            IndicatorConfig::Vwap { window } => IndicatorConfig::Vwap {
                window: params.window.or(window),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorConfig::Sma { .. } => IndicatorKind::Sma,
            IndicatorConfig::Ema { .. } => IndicatorKind::Ema,
            IndicatorConfig::Rsi { .. } => IndicatorKind::Rsi,
            IndicatorConfig::Bbands { .. } => IndicatorKind::Bbands,
            IndicatorConfig::Macd { .. } => IndicatorKind::Macd,
            IndicatorConfig::Stoch { .. } => IndicatorKind::Stoch,
            IndicatorConfig::Vwap { .. } => IndicatorKind::Vwap,
        }
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        let key = self.kind().key();
        let nonzero = |param: &'static str, value: usize| {
            if value == 0 {
                Err(SpecError::ZeroWindow {
                    indicator: key,
                    param,
                })
            } else {
                Ok(())
            }
        };

        match *self {
            IndicatorConfig::Sma { window }
            | IndicatorConfig::Ema { window }
            | IndicatorConfig::Rsi { window } => nonzero("window", window),
            IndicatorConfig::Bbands { window, window_dev } => {
                nonzero("window", window)?;
                if !window_dev.is_finite() || window_dev < 0.0 {
                    return Err(SpecError::InvalidDeviation(window_dev));
                }
                Ok(())
            }
            IndicatorConfig::Macd {
                window_fast,
                window_slow,
                window_sign,
            } => {
                nonzero("window_fast", window_fast)?;
                nonzero("window_slow", window_slow)?;
                nonzero("window_sign", window_sign)?;
                if window_fast >= window_slow {
                    return Err(SpecError::FastNotBelowSlow {
                        fast: window_fast,
                        slow: window_slow,
                    });
                }
                Ok(())
            }
            IndicatorConfig::Stoch {
                window,
                smooth_window,
            } => {
                nonzero("window", window)?;
                nonzero("smooth_window", smooth_window)
            }
            IndicatorConfig::Vwap { window } => window.map_or(Ok(()), |w| nonzero("window", w)),
        }
    }

    /// One indicator instance per output column, in column order.
    pub fn build(&self) -> Vec<Box<dyn Indicator>> {
        match *self {
            IndicatorConfig::Sma { window } => vec![Box::new(Sma::new(window))],
            IndicatorConfig::Ema { window } => vec![Box::new(Ema::new(window))],
            IndicatorConfig::Rsi { window } => vec![Box::new(Rsi::new(window))],
            IndicatorConfig::Bbands { window, window_dev } => vec![
                Box::new(Bollinger::upper(window, window_dev)),
                Box::new(Bollinger::middle(window, window_dev)),
                Box::new(Bollinger::lower(window, window_dev)),
            ],
            IndicatorConfig::Macd {
                window_fast,
                window_slow,
                window_sign,
            } => vec![
                Box::new(Macd::line(window_fast, window_slow, window_sign)),
                Box::new(Macd::signal(window_fast, window_slow, window_sign)),
                Box::new(Macd::histogram(window_fast, window_slow, window_sign)),
            ],
            IndicatorConfig::Stoch {
                window,
                smooth_window,
            } => vec![
                Box::new(Stochastic::k(window, smooth_window)),
                Box::new(Stochastic::d(window, smooth_window)),
            ],
            IndicatorConfig::Vwap { window } => match window {
                Some(w) => vec![Box::new(Vwap::rolling(w))],
                None => vec![Box::new(Vwap::cumulative())],
            },
        }
    }
}

/// Ordered indicator selection. Defaults to all seven kinds with their
/// default windows.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    entries: Vec<IndicatorConfig>,
}

impl Default for IndicatorSpec {
    fn default() -> Self {
        Self {
            entries: IndicatorKind::ALL
                .into_iter()
                .map(IndicatorConfig::default_for)
                .collect(),
        }
    }
}

impl IndicatorSpec {
    /// No indicators.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from `(key, params)` pairs. Unrecognised keys are skipped; a
    /// repeated key keeps its first position and takes the last parameters.
    pub fn from_entries<K: AsRef<str>>(
        entries: impl IntoIterator<Item = (K, IndicatorParams)>,
    ) -> Result<Self, SpecError> {
        let mut spec = Self::empty();
        for (key, params) in entries {
            let key = key.as_ref();
            match IndicatorKind::from_key(key) {
                Some(kind) => spec.insert(IndicatorConfig::from_params(kind, &params)?),
                None => debug!(indicator = key, "ignoring unrecognised indicator"),
            }
        }
        Ok(spec)
    }

    /// Add or replace the configuration for one kind.
    pub fn with(mut self, config: IndicatorConfig) -> Result<Self, SpecError> {
        config.validate()?;
        self.insert(config);
        Ok(self)
    }

    fn insert(&mut self, config: IndicatorConfig) {
        match self.entries.iter_mut().find(|e| e.kind() == config.kind()) {
            Some(existing) => *existing = config,
            None => self.entries.push(config),
        }
    }

    pub fn entries(&self) -> &[IndicatorConfig] {
        &self.entries
    }

    pub fn get(&self, kind: IndicatorKind) -> Option<&IndicatorConfig> {
        self.entries.iter().find(|e| e.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All indicator instances, in spec order.
    pub fn build(&self) -> Vec<Box<dyn Indicator>> {
        self.entries.iter().flat_map(IndicatorConfig::build).collect()
    }
}

impl FromStr for IndicatorSpec {
    type Err = SpecError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: String| SpecError::Parse {
            input: input.to_string(),
            reason,
        };

        let mut entries = Vec::new();
        for item in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, raw_params) = match item.split_once(':') {
                Some((k, p)) => (k.trim(), p),
                None => (item, ""),
            };
            if IndicatorKind::from_key(key).is_none() {
                debug!(indicator = key, "ignoring unrecognised indicator");
                continue;
            }

            let mut params = IndicatorParams::default();
            for pair in raw_params.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| parse_err(format!("expected name=value, got '{pair}'")))?;
                params
                    .set(name.trim(), value.trim())
                    .map_err(|reason| parse_err(format!("{key}: {reason}")))?;
            }
            entries.push((key.to_string(), params));
        }
        Self::from_entries(entries)
    }
}

impl<'de> Deserialize<'de> for IndicatorSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = IndicatorSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from indicator name to its parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, IndicatorParams)> = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    if IndicatorKind::from_key(&key).is_some() {
                        entries.push((key, map.next_value()?));
                    } else {
                        map.next_value::<IgnoredAny>()?;
                        debug!(indicator = %key, "ignoring unrecognised indicator");
                    }
                }
                IndicatorSpec::from_entries(entries).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(spec: &IndicatorSpec) -> Vec<String> {
        spec.build().iter().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn default_spec_columns() {
        assert_eq!(
            names(&IndicatorSpec::default()),
            vec![
                "sma", "ema", "rsi", "bb_high", "bb_mid", "bb_low", "macd", "macd_signal",
                "macd_diff", "stoch_k", "stoch_d", "vwap"
            ]
        );
    }

    #[test]
    fn parse_string_with_params() {
        let spec: IndicatorSpec = "sma:window=50; rsi ; macd:window_fast=8,window_slow=21"
            .parse()
            .unwrap();
        assert_eq!(
            spec.entries(),
            &[
                IndicatorConfig::Sma { window: 50 },
                IndicatorConfig::Rsi { window: 14 },
                IndicatorConfig::Macd {
                    window_fast: 8,
                    window_slow: 21,
                    window_sign: 9
                },
            ]
        );
    }

    #[test]
    fn unknown_indicator_is_ignored() {
        let spec: IndicatorSpec = "ichimoku:window=9;sma".parse().unwrap();
        assert_eq!(spec.entries(), &[IndicatorConfig::Sma { window: 20 }]);
    }

    #[test]
    fn repeated_key_keeps_position_takes_last_params() {
        let spec: IndicatorSpec = "sma:window=5;rsi;sma:window=7".parse().unwrap();
        assert_eq!(
            spec.entries(),
            &[
                IndicatorConfig::Sma { window: 7 },
                IndicatorConfig::Rsi { window: 14 }
            ]
        );
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(matches!(
            "sma:window=0".parse::<IndicatorSpec>(),
            Err(SpecError::ZeroWindow { .. })
        ));
        assert!(matches!(
            "macd:window_fast=30".parse::<IndicatorSpec>(),
            Err(SpecError::FastNotBelowSlow { fast: 30, slow: 26 })
        ));
        assert!(matches!(
            "sma:window_dev=2".parse::<IndicatorSpec>(),
            Err(SpecError::UnsupportedParameter { .. })
        ));
        assert!(matches!(
            "sma:length=2".parse::<IndicatorSpec>(),
            Err(SpecError::Parse { .. })
        ));
        assert!(matches!(
            "sma:window".parse::<IndicatorSpec>(),
            Err(SpecError::Parse { .. })
        ));
    }

    #[test]
    fn deserialize_from_toml_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            indicators: IndicatorSpec,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
            [indicators]
            bbands = { window = 10, window_dev = 1.5 }
            vwap = { window = 5 }
            supertrend = { period = 3 }
            "#,
        )
        .unwrap();
        assert_eq!(
            parsed.indicators.entries(),
            &[
                IndicatorConfig::Bbands {
                    window: 10,
                    window_dev: 1.5
                },
                IndicatorConfig::Vwap { window: Some(5) },
            ]
        );
    }

    #[test]
    fn deserialize_from_json_object() {
        let spec: IndicatorSpec =
            serde_json::from_str(r#"{"stoch": {"window": 5, "smooth_window": 2}, "ema": {}}"#)
                .unwrap();
        assert_eq!(
            spec.entries(),
            &[
                IndicatorConfig::Stoch {
                    window: 5,
                    smooth_window: 2
                },
                IndicatorConfig::Ema { window: 20 },
            ]
        );
    }

    #[test]
    fn with_replaces_existing_kind() {
        let spec = IndicatorSpec::default()
            .with(IndicatorConfig::Sma { window: 5 })
            .unwrap();
        assert_eq!(spec.len(), 7);
        assert_eq!(spec.get(IndicatorKind::Sma), Some(&IndicatorConfig::Sma { window: 5 }));
        assert!(IndicatorSpec::empty()
            .with(IndicatorConfig::Rsi { window: 0 })
            .is_err());
    }
}
