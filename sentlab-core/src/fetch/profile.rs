//! Company profile snapshot.

use chrono::NaiveDate;
use tracing::info;

use crate::data::{
    Column, DataError, Dataset, DatasetKey, DatasetStore, ProfileSource, Record, Value,
};

/// Cached profile for `as_of`: one record whose text columns are the profile
/// attributes in source order.
pub fn fetch_profile(
    store: &dyn DatasetStore,
    source: &dyn ProfileSource,
    ticker: &str,
    as_of: NaiveDate,
) -> Result<Dataset, DataError> {
    let key = DatasetKey::profile(ticker, as_of)?;
    store.get_or_fetch(&key, &mut || -> Result<Dataset, DataError> {
        info!(ticker = key.ticker(), source = source.name(), "fetching profile");
        let mut attributes = source.profile(key.ticker())?;

        // Attribute names become column names and must stay unique.
        let mut seen = std::collections::HashSet::new();
        attributes.retain(|(name, _)| !name.is_empty() && seen.insert(name.clone()));

        if attributes.is_empty() {
            return Err(DataError::NoDataInRange {
                ticker: key.ticker().to_string(),
                detail: "empty company profile".into(),
            });
        }

        let (columns, values): (Vec<Column>, Vec<Value>) = attributes
            .into_iter()
            .map(|(name, value)| (Column::text(name), Value::Text(value)))
            .unzip();
        Dataset::from_records(
            key.clone(),
            columns,
            vec![Record {
                date: as_of,
                values,
            }],
        )
    })
}
