//! Offline provider that generates deterministic random-walk bars.
//!
//! Each symbol gets its own sub-seed, derived by hashing the master seed with
//! the symbol via BLAKE3, so output for one symbol doesn't depend on which
//! other symbols were requested or in what order. Bars are produced for
//! weekdays only; holidays are not modelled.

use super::provider::{DataError, QuoteProvider};
use crate::domain::{Bar, BarSeries, Ticker};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    master_seed: u64,
    start_price: f64,
    /// Daily log-return standard deviation.
    volatility: f64,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(42)
    }
}

impl SyntheticProvider {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            start_price: 100.0,
            volatility: 0.015,
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    fn sub_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Generate the walk. Always starts at `start_price` on the first weekday
    /// of the range, so the same symbol and start date give the same prefix.
    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> BarSeries {
        let mut rng = StdRng::seed_from_u64(self.sub_seed(symbol));
        let mut bars = Vec::new();
        let mut prev_close = self.start_price;

        for date in start.iter_days().take_while(|d| *d <= end) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let gap: f64 = rng.gen_range(-0.5..0.5) * self.volatility;
            let ret: f64 = rng.gen_range(-1.0..1.0) * self.volatility * 1.7;
            let open = prev_close * gap.exp();
            let close = prev_close * ret.exp();
            let wick_up: f64 = rng.gen_range(0.0..1.0) * self.volatility;
            let wick_down: f64 = rng.gen_range(0.0..1.0) * self.volatility;
            let high = open.max(close) * (1.0 + wick_up);
            let low = open.min(close) * (1.0 - wick_down);
            let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();

            let mut bar = Bar::new(date, open, high, low, close, volume);
            bar.vwap = Some((high + low + close) / 3.0);
            bar.transactions = Some((volume / 100.0) as u64);
            bars.push(bar);
            prev_close = close;
        }

        BarSeries::new(symbol, bars)
    }
}

impl QuoteProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, DataError> {
        Ok(Ticker {
            symbol: symbol.to_string(),
            name: format!("{symbol} (synthetic)"),
            market: "stocks".into(),
            locale: "us".into(),
            primary_exchange: "SYNTH".into(),
            security_type: "CS".into(),
            active: true,
            currency: "usd".into(),
            cik: None,
            composite_figi: None,
            share_class_figi: None,
            last_updated_utc: None,
        })
    }

    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _adjusted: bool,
    ) -> Result<BarSeries, DataError> {
        if start > end {
            return Err(DataError::Provider(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(self.generate(symbol, start, end))
    }
}
