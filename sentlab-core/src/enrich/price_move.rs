//! Day-over-day price movement columns.

use crate::data::{Column, DataError, Dataset, Value};

pub const DIRECTION_COLUMN: &str = "Direction";
pub const PERCENT_CHANGE_COLUMN: &str = "PercentChange";

/// Append `Direction` (-1, 0 or 1) and `PercentChange` computed from `Close`.
///
/// The first row is `{0, 0}`; a zero previous close gives a 0 % change and a
/// missing close gives direction 0 with a NaN change. Returns `false`
/// without touching the dataset when `Direction` is already present.
pub fn add_price_move(dataset: &mut Dataset) -> Result<bool, DataError> {
    if dataset.has_column(DIRECTION_COLUMN) {
        return Ok(false);
    }
    let closes = dataset.numbers("Close")?;

    let mut direction = Vec::with_capacity(closes.len());
    let mut change = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        let (dir, pct) = match i.checked_sub(1).map(|p| closes[p]) {
            None => (0.0, 0.0),
            Some(prev) => move_between(prev, close),
        };
        direction.push(Value::Number(dir));
        change.push(Value::Number(pct));
    }

    dataset.append_column(Column::number(DIRECTION_COLUMN), direction)?;
    if !dataset.has_column(PERCENT_CHANGE_COLUMN) {
        dataset.append_column(Column::number(PERCENT_CHANGE_COLUMN), change)?;
    }
    Ok(true)
}

fn move_between(prev: f64, close: f64) -> (f64, f64) {
    if !prev.is_finite() || !close.is_finite() {
        return (0.0, f64::NAN);
    }
    let delta = close - prev;
    let direction = if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else {
        0.0
    };
    let pct = if prev == 0.0 { 0.0 } else { delta * 100.0 / prev };
    (direction, pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetKey, Record};
    use chrono::NaiveDate;

    fn prices(closes: &[f64]) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let key = DatasetKey::price("TEST", start, start + chrono::Duration::days(30)).unwrap();
        let records = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Record {
                date: start + chrono::Duration::days(i as i64),
                values: vec![Value::Number(c)],
            })
            .collect();
        Dataset::from_records(key, vec![Column::number("Close")], records).unwrap()
    }

    #[test]
    fn direction_and_percent_change() {
        let mut ds = prices(&[10.0, 11.0, 9.0, 12.0, 12.0, 13.0, 14.0]);
        assert!(add_price_move(&mut ds).unwrap());
        assert_eq!(
            ds.numbers(DIRECTION_COLUMN).unwrap(),
            vec![0.0, 1.0, -1.0, 1.0, 0.0, 1.0, 1.0]
        );
        let pct = ds.numbers(PERCENT_CHANGE_COLUMN).unwrap();
        assert_eq!(pct[0], 0.0);
        assert!((pct[1] - 10.0).abs() < 1e-12);
        assert!((pct[2] - (-2.0 * 100.0 / 11.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_previous_close_is_zero_change() {
        let mut ds = prices(&[0.0, 5.0]);
        add_price_move(&mut ds).unwrap();
        assert_eq!(ds.numbers(DIRECTION_COLUMN).unwrap(), vec![0.0, 1.0]);
        assert_eq!(ds.numbers(PERCENT_CHANGE_COLUMN).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut ds = prices(&[10.0, 11.0]);
        add_price_move(&mut ds).unwrap();
        let before = ds.clone();
        assert!(!add_price_move(&mut ds).unwrap());
        assert_eq!(ds, before);
    }

    #[test]
    fn requires_close() {
        let key = DatasetKey::price(
            "TEST",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap();
        let mut ds = Dataset::new(key, vec![Column::number("Open")]);
        assert!(matches!(
            add_price_move(&mut ds),
            Err(DataError::MissingColumn { .. })
        ));
    }
}
