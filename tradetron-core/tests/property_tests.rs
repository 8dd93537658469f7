//! Property tests for the validation gate and the cache contract.
//!
//! Uses proptest to verify:
//! 1. Clean series always validate
//! 2. Any single defect (non-positive price, negative volume, missing value,
//!    duplicate timestamp) makes validation fail
//! 3. Cache round-trip returns an equal series; any other range is a miss
//! 4. Processing never emits NaN and preserves timestamp order

use chrono::NaiveDate;
use proptest::prelude::*;
use tradetron_core::data::{validate, CacheStore, MemoryCache};
use tradetron_core::domain::{Bar, BarSeries};
use tradetron_core::features::{process, ProcessOptions};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_volume() -> impl Strategy<Value = f64> {
    (0.0..1.0e7_f64).prop_map(f64::round)
}

/// A clean series of 1..60 bars on consecutive days.
fn arb_series() -> impl Strategy<Value = BarSeries> {
    prop::collection::vec((arb_price(), arb_price(), arb_volume()), 1..60).prop_map(|rows| {
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = rows
            .into_iter()
            .enumerate()
            .map(|(i, (open, close, volume))| {
                let high = open.max(close) * 1.01;
                let low = open.min(close) * 0.99;
                Bar::new(base + chrono::Duration::days(i as i64), open, high, low, close, volume)
            })
            .collect();
        BarSeries::new("PROP", bars)
    })
}

#[derive(Debug, Clone, Copy)]
enum Defect {
    NonPositivePrice(usize),
    NegativeVolume,
    MissingValue(usize),
    DuplicateTimestamp,
}

fn arb_defect() -> impl Strategy<Value = Defect> {
    prop_oneof![
        (0usize..4).prop_map(Defect::NonPositivePrice),
        Just(Defect::NegativeVolume),
        (0usize..5).prop_map(Defect::MissingValue),
        Just(Defect::DuplicateTimestamp),
    ]
}

fn inject(series: &BarSeries, defect: Defect, row: usize) -> BarSeries {
    let mut bars = series.bars().to_vec();
    let row = row % bars.len();
    match defect {
        Defect::NonPositivePrice(field) => {
            let bar = &mut bars[row];
            let target = [&mut bar.open, &mut bar.high, &mut bar.low, &mut bar.close];
            *target.into_iter().nth(field).unwrap() = 0.0;
        }
        Defect::NegativeVolume => bars[row].volume = -1.0,
        Defect::MissingValue(field) => {
            let bar = &mut bars[row];
            let target = [
                &mut bar.open,
                &mut bar.high,
                &mut bar.low,
                &mut bar.close,
                &mut bar.volume,
            ];
            *target.into_iter().nth(field).unwrap() = f64::NAN;
        }
        Defect::DuplicateTimestamp => {
            let copy = bars[row].clone();
            bars.push(copy);
        }
    }
    BarSeries::new(series.symbol(), bars)
}

// ── 1. Clean series validate ─────────────────────────────────────────

proptest! {
    #[test]
    fn clean_series_validates(series in arb_series()) {
        prop_assert!(validate(&series));
    }
}

// ── 2. Any defect fails validation ───────────────────────────────────

proptest! {
    #[test]
    fn any_defect_fails_validation(
        series in arb_series(),
        defect in arb_defect(),
        row in 0usize..1000,
    ) {
        let broken = inject(&series, defect, row);
        prop_assert!(!validate(&broken), "{defect:?} at row {row} passed validation");
    }
}

// ── 3. Cache round-trip ──────────────────────────────────────────────

proptest! {
    #[test]
    fn cache_round_trip(series in arb_series(), shift in 1i64..30) {
        let cache = MemoryCache::new();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        cache.store("PROP", start, end, &series).unwrap();

        prop_assert_eq!(cache.lookup("PROP", start, end), Some(series));
        let other_end = end + chrono::Duration::days(shift);
        prop_assert!(cache.lookup("PROP", start, other_end).is_none());
        prop_assert!(cache.lookup("OTHER", start, end).is_none());
    }
}

// ── 4. Processing output is NaN-free and ordered ─────────────────────

proptest! {
    #[test]
    fn processed_output_is_clean(series in arb_series()) {
        let out = process(&series, &ProcessOptions::default().without_indicators()).unwrap();
        prop_assert_eq!(out.len() + out.dropped_rows(), series.len());
        for name in out.names() {
            let column = out.column(name).unwrap();
            prop_assert!(column.iter().all(|v| !v.is_nan()), "NaN in {}", name);
        }
        prop_assert!(out.timestamps().windows(2).all(|w| w[0] < w[1]));
    }
}
