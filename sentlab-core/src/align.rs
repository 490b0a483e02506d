//! Date alignment of heterogeneous series.
//!
//! Headlines and posts are irregular (many rows per day, gaps), prices have
//! one row per trading day. [`aggregate_daily`] reduces any dataset to one
//! row per date; [`align`] inner-joins any number of such tables on exact
//! dates. Dates missing from any input are dropped, never filled.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::data::{DataError, Dataset};

/// Fewest aligned rows worth comparing or modelling.
pub const MIN_USABLE_ROWS: usize = 4;

/// One row per date, numeric columns only.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTable {
    columns: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl DailyTable {
    /// Build from `(date, values)` rows; dates must be unique.
    pub fn from_rows(
        columns: Vec<String>,
        mut rows: Vec<(NaiveDate, Vec<f64>)>,
    ) -> Result<Self, DataError> {
        rows.sort_by_key(|(date, _)| *date);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(DataError::InvalidInput(format!("date {} appears twice", w[0].0)));
        }
        if let Some((date, _)) = rows.iter().find(|(_, v)| v.len() != columns.len()) {
            return Err(DataError::InvalidInput(format!(
                "row for {date} does not match {} columns",
                columns.len()
            )));
        }
        let (dates, rows): (Vec<NaiveDate>, Vec<Vec<f64>>) = rows.into_iter().unzip();
        Ok(Self {
            columns,
            dates,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// All values of one column in date order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::MissingColumn {
                column: name.to_string(),
            })?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Mean of each requested numeric column per date, NaN cells ignored.
///
/// A date whose cells in a column are all NaN keeps NaN for that column.
pub fn aggregate_daily(dataset: &Dataset, columns: &[&str]) -> Result<DailyTable, DataError> {
    let indices = columns
        .iter()
        .map(|name| dataset.numeric_index(name))
        .collect::<Result<Vec<_>, _>>()?;

    // (sum, count) per column for the date currently being folded.
    let mut rows: Vec<(NaiveDate, Vec<(f64, usize)>)> = Vec::new();
    for record in dataset.records() {
        if rows.last().map(|(d, _)| *d) != Some(record.date) {
            rows.push((record.date, vec![(0.0, 0); indices.len()]));
        }
        let Some((_, acc)) = rows.last_mut() else {
            continue;
        };
        for (slot, &idx) in acc.iter_mut().zip(&indices) {
            let v = record.values[idx].as_number().unwrap_or(f64::NAN);
            if !v.is_nan() {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let rows: Vec<(NaiveDate, Vec<f64>)> = rows
        .into_iter()
        .map(|(date, acc)| {
            let means: Vec<f64> = acc
                .into_iter()
                .map(|(sum, n)| if n == 0 { f64::NAN } else { sum / n as f64 })
                .collect();
            (date, means)
        })
        .collect();

    DailyTable::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
}

/// A date-indexed join of several labelled daily tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDataset {
    table: DailyTable,
}

impl AlignedDataset {
    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.table.dates()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        self.table.rows()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        self.table.column(name)
    }

    /// `InsufficientData` unless at least [`MIN_USABLE_ROWS`] dates aligned.
    pub fn ensure_usable(&self) -> Result<&Self, DataError> {
        if self.len() < MIN_USABLE_ROWS {
            return Err(DataError::InsufficientData {
                rows: self.len(),
                required: MIN_USABLE_ROWS,
            });
        }
        Ok(self)
    }
}

/// Name of a column that appears in more than one input.
pub fn suffixed(column: &str, label: &str) -> String {
    format!("{column} - {label}")
}

/// Inner-join `inputs` on exact dates.
///
/// Output columns follow input order. A column name carried by more than
/// one input is renamed to `"{column} - {label}"` in every input carrying it.
pub fn align(inputs: &[(&str, &DailyTable)]) -> Result<AlignedDataset, DataError> {
    let Some((_, first)) = inputs.first() else {
        return Err(DataError::InvalidInput("nothing to align".into()));
    };

    let mut owners: HashMap<&str, usize> = HashMap::new();
    for (_, table) in inputs {
        for column in table.columns() {
            *owners.entry(column.as_str()).or_default() += 1;
        }
    }

    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    for (label, table) in inputs {
        for column in table.columns() {
            let name = if owners[column.as_str()] > 1 {
                suffixed(column, label)
            } else {
                column.clone()
            };
            if !seen.insert(name.clone()) {
                return Err(DataError::InvalidInput(format!(
                    "column '{name}' would appear twice; labels must be unique"
                )));
            }
            columns.push(name);
        }
    }

    let lookups: Vec<HashMap<NaiveDate, usize>> = inputs
        .iter()
        .map(|(_, t)| t.dates().iter().enumerate().map(|(i, d)| (*d, i)).collect())
        .collect();

    let mut rows = Vec::new();
    for date in first.dates() {
        let positions: Option<Vec<usize>> = lookups.iter().map(|l| l.get(date).copied()).collect();
        let Some(positions) = positions else {
            continue;
        };
        let row: Vec<f64> = inputs
            .iter()
            .zip(positions)
            .flat_map(|((_, table), pos)| table.rows()[pos].iter().copied())
            .collect();
        rows.push((*date, row));
    }

    debug!(inputs = inputs.len(), rows = rows.len(), "aligned tables");
    Ok(AlignedDataset {
        table: DailyTable::from_rows(columns, rows)?,
    })
}
