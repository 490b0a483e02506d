//! Daily price history.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::data::{
    Column, DataError, Dataset, DatasetKey, DatasetStore, KeyParams, PriceSource, RawBar, Record,
    Value,
};

/// Columns of a price dataset, in storage order.
pub const PRICE_COLUMNS: [&str; 6] = ["Open", "High", "Low", "Close", "AdjClose", "Volume"];

/// Cached daily bars for `[start, end]`.
///
/// A range containing no trading day (a lone weekend day, a holiday week) is
/// `NoDataInRange` and nothing is saved.
pub fn fetch_prices(
    store: &dyn DatasetStore,
    source: &dyn PriceSource,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Dataset, DataError> {
    let key = DatasetKey::price(ticker, start, end)?;
    store.get_or_fetch(&key, &mut || -> Result<Dataset, DataError> {
        info!(ticker = key.ticker(), %start, %end, source = source.name(), "fetching prices");
        let bars = source.daily_bars(key.ticker(), start, end)?;
        bars_to_dataset(&key, bars)
    })
}

/// Build a price dataset from raw bars.
///
/// Bars outside the key's range are dropped and a repeated date keeps the
/// last bar seen.
pub fn bars_to_dataset(key: &DatasetKey, mut bars: Vec<RawBar>) -> Result<Dataset, DataError> {
    let (start, end) = match key.params() {
        KeyParams::Range { start, end } => (start, end),
        other => {
            return Err(DataError::InvalidKey(format!(
                "price key needs a date range, got {other:?}"
            )))
        }
    };

    let fetched = bars.len();
    bars.retain(|b| b.date >= start && b.date <= end);
    bars.sort_by_key(|b| b.date);
    bars.reverse();
    bars.dedup_by_key(|b| b.date);
    bars.reverse();

    if bars.len() != fetched {
        debug!(%key, fetched, kept = bars.len(), "dropped out-of-range or repeated bars");
    }

    if bars.is_empty() {
        return Err(DataError::NoDataInRange {
            ticker: key.ticker().to_string(),
            detail: format!("no trading days between {start} and {end}"),
        });
    }

    let columns = PRICE_COLUMNS.iter().map(|&c| Column::number(c)).collect();
    let records = bars
        .into_iter()
        .map(|b| Record {
            date: b.date,
            values: vec![
                Value::Number(b.open),
                Value::Number(b.high),
                Value::Number(b.low),
                Value::Number(b.close),
                Value::Number(b.adj_close),
                Value::Number(b.volume as f64),
            ],
        })
        .collect();

    Dataset::from_records(key.clone(), columns, records)
}
