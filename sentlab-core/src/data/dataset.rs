//! Date-indexed tables with an append-only column set.
//!
//! A [`Dataset`] is ordered by date but not unique by date: several headlines
//! or posts may share a day until the aligner aggregates them. Values are
//! stored row-wise and positionally against the column list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::key::DatasetKey;
use super::provider::DataError;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    Text,
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Number,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Text,
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Number(_) => ColumnKind::Number,
            Value::Text(_) => ColumnKind::Text,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// One dated row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub values: Vec<Value>,
}

/// A date-ordered table tagged with its identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    key: DatasetKey,
    columns: Vec<Column>,
    records: Vec<Record>,
}

impl Dataset {
    /// Empty dataset with the given columns.
    pub fn new(key: DatasetKey, columns: Vec<Column>) -> Self {
        Self {
            key,
            columns,
            records: Vec::new(),
        }
    }

    /// Build a dataset from rows, validating arity and cell types.
    ///
    /// Records are stably sorted by date, so same-day rows keep their order.
    pub fn from_records(
        key: DatasetKey,
        columns: Vec<Column>,
        records: Vec<Record>,
    ) -> Result<Self, DataError> {
        let mut dataset = Self::new(key, columns);
        for record in records {
            dataset.push(record)?;
        }
        dataset.records.sort_by_key(|r| r.date);
        Ok(dataset)
    }

    /// Append a record. Callers pushing out of date order must re-sort.
    pub fn push(&mut self, record: Record) -> Result<(), DataError> {
        if record.values.len() != self.columns.len() {
            return Err(DataError::InvalidInput(format!(
                "record for {} has {} values, dataset has {} columns",
                record.date,
                record.values.len(),
                self.columns.len()
            )));
        }
        for (value, column) in record.values.iter().zip(&self.columns) {
            if value.kind() != column.kind {
                return Err(DataError::InvalidInput(format!(
                    "column '{}' expects {:?}, got {:?} on {}",
                    column.name,
                    column.kind,
                    value.kind(),
                    record.date
                )));
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn key(&self) -> &DatasetKey {
        &self.key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Distinct dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.records.iter().map(|r| r.date).collect();
        dates.dedup();
        dates
    }

    /// All values of a numeric column, in row order.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let idx = self.numeric_index(name)?;
        Ok(self
            .records
            .iter()
            .map(|r| r.values[idx].as_number().unwrap_or(f64::NAN))
            .collect())
    }

    /// All values of a text column, in row order.
    pub fn texts(&self, name: &str) -> Result<Vec<&str>, DataError> {
        let idx = self.column_index(name).ok_or_else(|| DataError::MissingColumn {
            column: name.to_string(),
        })?;
        if self.columns[idx].kind != ColumnKind::Text {
            return Err(DataError::InvalidInput(format!("column '{name}' is not text")));
        }
        Ok(self
            .records
            .iter()
            .map(|r| r.values[idx].as_text().unwrap_or(""))
            .collect())
    }

    pub(crate) fn numeric_index(&self, name: &str) -> Result<usize, DataError> {
        let idx = self.column_index(name).ok_or_else(|| DataError::MissingColumn {
            column: name.to_string(),
        })?;
        if self.columns[idx].kind != ColumnKind::Number {
            return Err(DataError::InvalidInput(format!(
                "column '{name}' is not numeric"
            )));
        }
        Ok(idx)
    }

    /// Append a column; one value per existing record.
    ///
    /// Existing columns are never rewritten; appending a name that already
    /// exists is an error.
    pub fn append_column(&mut self, column: Column, values: Vec<Value>) -> Result<(), DataError> {
        if self.has_column(&column.name) {
            return Err(DataError::InvalidInput(format!(
                "column '{}' already exists",
                column.name
            )));
        }
        if values.len() != self.records.len() {
            return Err(DataError::InvalidInput(format!(
                "column '{}' has {} values for {} records",
                column.name,
                values.len(),
                self.records.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| v.kind() != column.kind) {
            return Err(DataError::InvalidInput(format!(
                "column '{}' expects {:?}, got {:?}",
                column.name,
                column.kind,
                bad.kind()
            )));
        }
        for (record, value) in self.records.iter_mut().zip(values) {
            record.values.push(value);
        }
        self.columns.push(column);
        Ok(())
    }

    /// Deterministic BLAKE3 digest of columns and cell contents.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for column in &self.columns {
            hasher.update(column.name.as_bytes());
            hasher.update(&[0, column.kind as u8]);
        }
        for record in &self.records {
            hasher.update(record.date.to_string().as_bytes());
            for value in &record.values {
                match value {
                    Value::Number(v) => {
                        hasher.update(&[1]);
                        hasher.update(&v.to_bits().to_le_bytes());
                    }
                    Value::Text(s) => {
                        hasher.update(&[2]);
                        hasher.update(&(s.len() as u64).to_le_bytes());
                        hasher.update(s.as_bytes());
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> DatasetKey {
        DatasetKey::headlines("TEST", NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), 1).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn from_records_sorts_stably_by_date() {
        let ds = Dataset::from_records(
            key(),
            vec![Column::text("Headline")],
            vec![
                Record { date: day(9), values: vec!["b".into()] },
                Record { date: day(8), values: vec!["a".into()] },
                Record { date: day(9), values: vec!["c".into()] },
            ],
        )
        .unwrap();
        assert_eq!(ds.texts("Headline").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(ds.dates(), vec![day(8), day(9)]);
    }

    #[test]
    fn push_rejects_wrong_arity_and_type() {
        let mut ds = Dataset::new(key(), vec![Column::number("Close")]);
        assert!(ds.push(Record { date: day(1), values: vec![] }).is_err());
        assert!(ds
            .push(Record { date: day(1), values: vec!["x".into()] })
            .is_err());
        assert!(ds.push(Record { date: day(1), values: vec![1.0.into()] }).is_ok());
    }

    #[test]
    fn append_column_is_append_only() {
        let mut ds = Dataset::from_records(
            key(),
            vec![Column::number("Close")],
            vec![Record { date: day(1), values: vec![1.0.into()] }],
        )
        .unwrap();
        ds.append_column(Column::number("Direction"), vec![0.0.into()]).unwrap();
        assert!(ds
            .append_column(Column::number("Direction"), vec![1.0.into()])
            .is_err());
        assert!(ds.append_column(Column::number("Other"), vec![]).is_err());
        assert_eq!(ds.columns().len(), 2);
    }

    #[test]
    fn content_hash_tracks_values() {
        let a = Dataset::from_records(
            key(),
            vec![Column::number("Close")],
            vec![Record { date: day(1), values: vec![1.0.into()] }],
        )
        .unwrap();
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());
        b.append_column(Column::number("X"), vec![2.0.into()]).unwrap();
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
