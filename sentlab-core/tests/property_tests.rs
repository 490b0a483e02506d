//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Key determinism: equal inputs give equal storage names and fingerprints
//! 2. Join correctness: aligned dates are exactly the intersection of inputs
//! 3. Aggregation: a daily value is the mean of that day's finite cells
//! 4. Enrichment idempotence: a second pass never changes the dataset

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::BTreeSet;

use sentlab_core::align::{aggregate_daily, align, DailyTable};
use sentlab_core::data::{Column, Dataset, DatasetKey, Record, Value};
use sentlab_core::enrich::add_price_move;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_ticker() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,5}"
}

fn arb_day_set() -> impl Strategy<Value = BTreeSet<i64>> {
    prop::collection::btree_set(0..40i64, 0..25)
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), 1..40)
}

fn table(days: &BTreeSet<i64>, column: &str) -> DailyTable {
    DailyTable::from_rows(
        vec![column.to_string()],
        days.iter()
            .map(|&o| (base() + Duration::days(o), vec![o as f64]))
            .collect(),
    )
    .unwrap()
}

// ── 1. Key determinism ───────────────────────────────────────────────

proptest! {
    #[test]
    fn keys_are_deterministic_and_case_insensitive(
        ticker in arb_ticker(),
        start in 0..300i64,
        len in 0..60i64,
    ) {
        let start = base() + Duration::days(start);
        let end = start + Duration::days(len);
        let a = DatasetKey::price(&ticker, start, end).unwrap();
        let b = DatasetKey::price(&ticker.to_lowercase(), start, end).unwrap();
        prop_assert_eq!(a.storage_name(), b.storage_name());
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
        prop_assert_eq!(DatasetKey::from_storage_name(&a.storage_name()), Some(a));
    }
}

// ── 2. Join correctness ──────────────────────────────────────────────

proptest! {
    #[test]
    fn join_is_date_intersection(
        a in arb_day_set(),
        b in arb_day_set(),
        c in arb_day_set(),
    ) {
        let (ta, tb, tc) = (table(&a, "X"), table(&b, "X"), table(&c, "Y"));
        let aligned = align(&[("a", &ta), ("b", &tb), ("c", &tc)]).unwrap();

        let expected: Vec<NaiveDate> = a
            .iter()
            .filter(|d| b.contains(d) && c.contains(d))
            .map(|&o| base() + Duration::days(o))
            .collect();
        prop_assert_eq!(aligned.dates(), expected.as_slice());
        prop_assert_eq!(aligned.columns(), &["X - a", "X - b", "Y"]);

        // Every row carries each input's own value for that date.
        for (date, row) in aligned.dates().iter().zip(aligned.rows()) {
            let offset = (*date - base()).num_days() as f64;
            prop_assert!(row.iter().all(|v| *v == offset));
        }
    }
}

// ── 3. Aggregation ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn daily_value_is_mean_of_finite_cells(
        cells in prop::collection::vec((0..5i64, prop::option::of(-1.0..1.0_f64)), 1..40),
    ) {
        let key = DatasetKey::headlines("TEST", base(), 1).unwrap();
        let records = cells
            .iter()
            .map(|&(o, v)| Record {
                date: base() + Duration::days(o),
                values: vec![Value::Number(v.unwrap_or(f64::NAN))],
            })
            .collect();
        let ds = Dataset::from_records(key, vec![Column::number("Polarity")], records).unwrap();
        let daily = aggregate_daily(&ds, &["Polarity"]).unwrap();
        let means = daily.column("Polarity").unwrap();

        for (date, mean) in daily.dates().iter().zip(means) {
            let offset = (*date - base()).num_days();
            let finite: Vec<f64> = cells
                .iter()
                .filter(|(o, _)| *o == offset)
                .filter_map(|(_, v)| *v)
                .collect();
            if finite.is_empty() {
                prop_assert!(mean.is_nan());
            } else {
                let expected = finite.iter().sum::<f64>() / finite.len() as f64;
                prop_assert!((mean - expected).abs() < 1e-12);
            }
        }
    }
}

// ── 4. Enrichment idempotence ────────────────────────────────────────

proptest! {
    #[test]
    fn price_move_is_idempotent_and_signed(closes in arb_closes()) {
        let end = base() + Duration::days(closes.len() as i64);
        let key = DatasetKey::price("TEST", base(), end).unwrap();
        let records = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Record {
                date: base() + Duration::days(i as i64),
                values: vec![Value::Number(c)],
            })
            .collect();
        let mut ds = Dataset::from_records(key, vec![Column::number("Close")], records).unwrap();

        prop_assert!(add_price_move(&mut ds).unwrap());
        let once = ds.clone();
        prop_assert!(!add_price_move(&mut ds).unwrap());
        prop_assert_eq!(&ds, &once);

        let direction = ds.numbers("Direction").unwrap();
        let change = ds.numbers("PercentChange").unwrap();
        prop_assert_eq!(direction[0], 0.0);
        prop_assert_eq!(change[0], 0.0);
        for i in 1..closes.len() {
            let expected = if closes[i] > closes[i - 1] {
                1.0
            } else if closes[i] < closes[i - 1] {
                -1.0
            } else {
                0.0
            };
            prop_assert_eq!(direction[i], expected);
            prop_assert_eq!(direction[i] > 0.0, change[i] > 0.0);
        }
    }
}
