//! Enrichers: append derived columns to a dataset.
//!
//! Enrichers never rewrite existing columns. Each reports whether it added
//! anything so callers only re-save datasets that actually changed.

pub mod oracle;
pub mod price_move;
pub mod sentiment;

pub use oracle::{Intensity, SentimentOracle, SentimentScore, VaderOracle};
pub use price_move::{add_price_move, DIRECTION_COLUMN, PERCENT_CHANGE_COLUMN};
pub use sentiment::{add_sentiment, SENTIMENT_COLUMNS};

use tracing::info;

use crate::data::{DataError, Dataset, DatasetStore};

/// Apply `enrich` and persist the result under the dataset's own key when
/// columns were added.
pub fn enrich_and_save(
    store: &dyn DatasetStore,
    mut dataset: Dataset,
    enrich: impl FnOnce(&mut Dataset) -> Result<bool, DataError>,
) -> Result<Dataset, DataError> {
    if enrich(&mut dataset)? {
        info!(key = %dataset.key(), columns = dataset.columns().len(), "saving enriched dataset");
        store.save(dataset.key(), &dataset)?;
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, DatasetKey, MemoryStore, Record, Value};
    use chrono::NaiveDate;

    #[test]
    fn saves_only_when_columns_were_added() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let key = DatasetKey::price("TEST", start, start).unwrap();
        let ds = Dataset::from_records(
            key.clone(),
            vec![Column::number("Close")],
            vec![Record {
                date: start,
                values: vec![Value::Number(10.0)],
            }],
        )
        .unwrap();

        let store = MemoryStore::new();
        let unchanged = enrich_and_save(&store, ds, |_| Ok(false)).unwrap();
        assert!(!store.exists(&key));

        let enriched = enrich_and_save(&store, unchanged, add_price_move).unwrap();
        assert_eq!(store.load(&key).unwrap(), enriched);
        assert!(enriched.has_column(DIRECTION_COLUMN));
    }
}
