//! Paginated headline listings.
//!
//! Listing pages print a relative age next to each headline, so the stored
//! `Date` is `retrieved_at - elapsed` truncated to a calendar day. This is an
//! approximation anchored to the moment the page was read: it drifts by the
//! page's rounding ("3d" covers a whole day) and is not a publication date.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::data::{
    Column, DataError, Dataset, DatasetKey, DatasetStore, HeadlineSource, Record, Value,
};

/// The single text column of a headline dataset.
pub const HEADLINE_COLUMN: &str = "Headline";

/// Calendar day `elapsed` before `anchor`.
///
/// Accepts `<amount><unit>` with unit `m`, `h` or `d` and an optional
/// thousands separator in the amount ("1,440m").
pub fn resolve_relative_date(elapsed: &str, anchor: NaiveDateTime) -> Result<NaiveDate, DataError> {
    let elapsed = elapsed.trim();
    let bad = || DataError::InvalidInput(format!("unrecognized elapsed time '{elapsed}'"));

    let unit = elapsed.chars().last().ok_or_else(bad)?;
    let amount: i64 = elapsed[..elapsed.len() - unit.len_utf8()]
        .replace(',', "")
        .parse()
        .map_err(|_| bad())?;
    if amount < 0 {
        return Err(bad());
    }

    let delta = match unit {
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
    .ok_or_else(bad)?;

    anchor
        .checked_sub_signed(delta)
        .map(|dt| dt.date())
        .ok_or_else(bad)
}

/// Cached headlines from listing pages `1..=pages`, keyed by the as-of day.
pub fn fetch_headlines(
    store: &dyn DatasetStore,
    source: &dyn HeadlineSource,
    ticker: &str,
    pages: u32,
    as_of: NaiveDate,
) -> Result<Dataset, DataError> {
    let key = DatasetKey::headlines(ticker, as_of, pages)?;
    store.get_or_fetch(&key, &mut || -> Result<Dataset, DataError> {
        info!(ticker = key.ticker(), pages, source = source.name(), "fetching headlines");
        let mut records = Vec::new();
        for page_no in 1..=pages {
            let page = source.page(key.ticker(), page_no)?;
            for item in page.items {
                match resolve_relative_date(&item.elapsed, page.retrieved_at) {
                    Ok(date) => records.push(Record {
                        date,
                        values: vec![Value::Text(item.title)],
                    }),
                    Err(e) => warn!(page = page_no, title = %item.title, error = %e, "skipping headline"),
                }
            }
        }

        if records.is_empty() {
            return Err(DataError::NoDataInRange {
                ticker: key.ticker().to_string(),
                detail: format!("no headlines on {pages} listing page(s)"),
            });
        }
        Dataset::from_records(key.clone(), vec![Column::text(HEADLINE_COLUMN)], records)
    })
}
