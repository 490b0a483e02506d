//! Dataset store: the single choke point for "fetch at most once per key".
//!
//! Layout of [`FileStore`]: `{cache_dir}/{storage_name}.csv` plus a
//! `{storage_name}.meta.json` sidecar (key, column kinds, hash, write time).
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place); last full write wins
//! - Integrity validation on load (header, arity, cell types)
//! - Quarantine for corrupt files ({filename}.quarantined)
//! - Column kinds inferred when the sidecar is missing or stale
//!
//! The store does no locking. Distinct keys never contend; two concurrent
//! fetches for the same key can both hit the network, and the later save
//! wins without corrupting anything.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::dataset::{Column, ColumnKind, Dataset, Record, Value};
use super::key::DatasetKey;
use super::provider::DataError;

const DATE_HEADER: &str = "Date";

/// Key-value persistence for datasets.
pub trait DatasetStore {
    fn exists(&self, key: &DatasetKey) -> bool;

    /// Load a dataset; `NotFound` when absent.
    fn load(&self, key: &DatasetKey) -> Result<Dataset, DataError>;

    /// Persist a dataset, overwriting unconditionally.
    fn save(&self, key: &DatasetKey, dataset: &Dataset) -> Result<(), DataError>;

    /// Return the cached dataset, or run `fetch` once, save and return it.
    ///
    /// A failed fetch saves nothing.
    fn get_or_fetch(
        &self,
        key: &DatasetKey,
        fetch: &mut dyn FnMut() -> Result<Dataset, DataError>,
    ) -> Result<Dataset, DataError> {
        if self.exists(key) {
            debug!(%key, "cache hit");
            return self.load(key);
        }

        info!(%key, "cache miss, fetching");
        let dataset = fetch()?;
        self.save(key, &dataset)?;
        Ok(dataset)
    }
}

fn check_key(key: &DatasetKey, dataset: &Dataset) -> Result<(), DataError> {
    if dataset.key() != key {
        return Err(DataError::InvalidInput(format!(
            "dataset tagged {} cannot be saved under {key}",
            dataset.key()
        )));
    }
    Ok(())
}

/// Metadata sidecar for a cached artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub key: DatasetKey,
    pub fingerprint: String,
    pub columns: Vec<Column>,
    pub row_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub data_hash: String,
    pub cached_at: NaiveDateTime,
}

/// One artifact found by [`FileStore::status`].
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: DatasetKey,
    pub size_bytes: u64,
    pub meta: Option<CacheMeta>,
}

/// Filesystem store writing CSV artifacts.
#[derive(Debug, Clone)]
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the CSV artifact for a key.
    pub fn data_path(&self, key: &DatasetKey) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", key.storage_name()))
    }

    fn meta_path(&self, key: &DatasetKey) -> PathBuf {
        self.cache_dir.join(format!("{}.meta.json", key.storage_name()))
    }

    /// Read the metadata sidecar, if present and parseable.
    pub fn get_meta(&self, key: &DatasetKey) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Every artifact in the cache directory whose name parses as a key,
    /// sorted by storage name.
    pub fn status(&self) -> Result<Vec<CacheEntry>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(DatasetKey::from_storage_name)
            else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let meta = self.get_meta(&key);
            out.push(CacheEntry {
                key,
                size_bytes,
                meta,
            });
        }
        out.sort_by_key(|e| e.key.storage_name());
        Ok(out)
    }

    fn quarantine(&self, path: &Path, reason: &DataError) {
        let quarantine = path.with_extension("csv.quarantined");
        warn!(
            path = %path.display(),
            error = %reason,
            "quarantining corrupt cache file"
        );
        let _ = fs::rename(path, quarantine);
    }
}

impl DatasetStore for FileStore {
    fn exists(&self, key: &DatasetKey) -> bool {
        self.data_path(key).is_file()
    }

    fn load(&self, key: &DatasetKey) -> Result<Dataset, DataError> {
        let path = self.data_path(key);
        if !path.is_file() {
            return Err(DataError::NotFound {
                key: key.storage_name(),
            });
        }

        let declared = self.get_meta(key).map(|m| m.columns);
        match read_csv(key, &path, declared.as_deref()) {
            Ok(dataset) => Ok(dataset),
            Err(e) => {
                self.quarantine(&path, &e);
                Err(e)
            }
        }
    }

    fn save(&self, key: &DatasetKey, dataset: &Dataset) -> Result<(), DataError> {
        check_key(key, dataset)?;
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.data_path(key);
        let tmp_path = path.with_extension("csv.tmp");
        write_csv(dataset, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            key: key.clone(),
            fingerprint: key.fingerprint(),
            columns: dataset.columns().to_vec(),
            row_count: dataset.len(),
            first_date: dataset.records().first().map(|r| r.date),
            last_date: dataset.records().last().map(|r| r.date),
            data_hash: dataset.content_hash(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        let meta_path = self.meta_path(key);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;
        fs::rename(&meta_tmp, &meta_path)
            .map_err(|e| DataError::CacheError(format!("meta rename: {e}")))?;

        debug!(%key, rows = dataset.len(), "saved dataset");
        Ok(())
    }
}

/// In-memory store for tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: Mutex<HashMap<DatasetKey, Dataset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.datasets.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DatasetStore for MemoryStore {
    fn exists(&self, key: &DatasetKey) -> bool {
        self.datasets
            .lock()
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }

    fn load(&self, key: &DatasetKey) -> Result<Dataset, DataError> {
        let map = self
            .datasets
            .lock()
            .map_err(|_| DataError::CacheError("memory store lock poisoned".into()))?;
        map.get(key).cloned().ok_or_else(|| DataError::NotFound {
            key: key.storage_name(),
        })
    }

    fn save(&self, key: &DatasetKey, dataset: &Dataset) -> Result<(), DataError> {
        check_key(key, dataset)?;
        let mut map = self
            .datasets
            .lock()
            .map_err(|_| DataError::CacheError("memory store lock poisoned".into()))?;
        map.insert(key.clone(), dataset.clone());
        Ok(())
    }
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

fn write_csv(dataset: &Dataset, path: &Path) -> Result<(), DataError> {
    let map_err = |e: csv::Error| DataError::CacheError(format!("csv write: {e}"));
    let mut writer = csv::Writer::from_path(path).map_err(map_err)?;

    let mut header = Vec::with_capacity(dataset.columns().len() + 1);
    header.push(DATE_HEADER.to_string());
    header.extend(dataset.columns().iter().map(|c| c.name.clone()));
    writer.write_record(&header).map_err(map_err)?;

    for record in dataset.records() {
        let mut row = Vec::with_capacity(record.values.len() + 1);
        row.push(record.date.format("%Y-%m-%d").to_string());
        for value in &record.values {
            row.push(match value {
                // `Display` for f64 is the shortest exact round-trip form.
                Value::Number(v) => v.to_string(),
                Value::Text(s) => s.clone(),
            });
        }
        writer.write_record(&row).map_err(map_err)?;
    }

    writer
        .flush()
        .map_err(|e| DataError::CacheError(format!("csv flush: {e}")))
}

fn read_csv(
    key: &DatasetKey,
    path: &Path,
    declared: Option<&[Column]>,
) -> Result<Dataset, DataError> {
    let map_err = |e: csv::Error| DataError::CacheError(format!("csv read: {e}"));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(map_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(map_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.first().map(String::as_str) != Some(DATE_HEADER) {
        return Err(DataError::CacheError(format!(
            "first column must be '{DATE_HEADER}', found {:?}",
            headers.first()
        )));
    }
    let names = &headers[1..];

    let mut raw_rows: Vec<(NaiveDate, Vec<String>)> = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(map_err)?;
        if row.len() != headers.len() {
            return Err(DataError::CacheError(format!(
                "row {} has {} cells, expected {}",
                idx + 2,
                row.len(),
                headers.len()
            )));
        }
        let date = NaiveDate::parse_from_str(&row[0], "%Y-%m-%d").map_err(|e| {
            DataError::CacheError(format!("invalid date '{}' on row {}: {e}", &row[0], idx + 2))
        })?;
        raw_rows.push((date, row.iter().skip(1).map(str::to_string).collect()));
    }

    let columns = match declared {
        Some(cols) if cols.iter().map(|c| c.name.as_str()).eq(names.iter().map(String::as_str)) => {
            cols.to_vec()
        }
        _ => infer_columns(names, &raw_rows),
    };

    let mut records = Vec::with_capacity(raw_rows.len());
    for (date, cells) in raw_rows {
        let values = cells
            .into_iter()
            .zip(&columns)
            .map(|(cell, column)| parse_cell(cell, column, date))
            .collect::<Result<Vec<_>, _>>()?;
        records.push(Record { date, values });
    }

    Dataset::from_records(key.clone(), columns, records)
}

fn infer_columns(names: &[String], rows: &[(NaiveDate, Vec<String>)]) -> Vec<Column> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let numeric = rows
                .iter()
                .map(|(_, cells)| cells[i].trim())
                .all(|cell| cell.is_empty() || cell.parse::<f64>().is_ok());
            if numeric {
                Column::number(name.clone())
            } else {
                Column::text(name.clone())
            }
        })
        .collect()
}

fn parse_cell(cell: String, column: &Column, date: NaiveDate) -> Result<Value, DataError> {
    match column.kind {
        ColumnKind::Text => Ok(Value::Text(cell)),
        ColumnKind::Number => {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                return Ok(Value::Number(f64::NAN));
            }
            trimmed.parse::<f64>().map(Value::Number).map_err(|e| {
                DataError::CacheError(format!(
                    "column '{}' on {date}: '{trimmed}' is not a number: {e}",
                    column.name
                ))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn key() -> DatasetKey {
        DatasetKey::price("TEST", day(2), day(3)).unwrap()
    }

    fn sample() -> Dataset {
        Dataset::from_records(
            key(),
            vec![Column::number("Close"), Column::text("Note")],
            vec![
                Record {
                    date: day(2),
                    values: vec![Value::Number(101.25), "plain".into()],
                },
                Record {
                    date: day(3),
                    values: vec![Value::Number(0.1 + 0.2), "has, comma\nand newline".into()],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn file_store_roundtrip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(!store.exists(&key()));
        store.save(&key(), &sample()).unwrap();
        assert!(store.exists(&key()));
        assert_eq!(store.load(&key()).unwrap(), sample());
        assert!(dir.path().join("TEST_HisPrice_20240102_20240103.csv").is_file());
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.load(&key()), Err(DataError::NotFound { .. })));
    }

    #[test]
    fn numeric_text_survives_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let ds = Dataset::from_records(
            key(),
            vec![Column::text("Headline")],
            vec![Record { date: day(2), values: vec!["2024".into()] }],
        )
        .unwrap();
        store.save(&key(), &ds).unwrap();
        assert_eq!(store.load(&key()).unwrap(), ds);
    }

    #[test]
    fn kinds_inferred_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(
            store.data_path(&key()),
            "\u{feff}Date,Close,Headline\n2024-01-02,10.5,up\n2024-01-03,,down\n",
        )
        .unwrap();

        let ds = store.load(&key()).unwrap();
        assert_eq!(ds.columns()[0], Column::number("Close"));
        assert_eq!(ds.columns()[1], Column::text("Headline"));
        let closes = ds.numbers("Close").unwrap();
        assert_eq!(closes[0], 10.5);
        assert!(closes[1].is_nan());
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.data_path(&key()), "Date,Close\nnot-a-date,1\n").unwrap();

        assert!(matches!(store.load(&key()), Err(DataError::CacheError(_))));
        assert!(!store.exists(&key()));
        assert!(dir
            .path()
            .join("TEST_HisPrice_20240102_20240103.csv.quarantined")
            .exists());
    }

    #[test]
    fn get_or_fetch_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let calls = Cell::new(0);
        let mut fetch = || -> Result<Dataset, DataError> {
            calls.set(calls.get() + 1);
            Ok(sample())
        };

        let first = store.get_or_fetch(&key(), &mut fetch).unwrap();
        let second = store.get_or_fetch(&key(), &mut fetch).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn failed_fetch_saves_nothing() {
        let store = MemoryStore::new();
        let result = store.get_or_fetch(&key(), &mut || -> Result<Dataset, DataError> {
            Err(DataError::SourceUnavailable("offline".into()))
        });
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn save_rejects_mismatched_key() {
        let store = MemoryStore::new();
        let other = DatasetKey::price("OTHER", day(2), day(3)).unwrap();
        assert!(store.save(&other, &sample()).is_err());
    }

    #[test]
    fn status_lists_artifacts_with_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(&key(), &sample()).unwrap();
        fs::write(dir.path().join("unrelated.csv"), "x\n").unwrap();

        let entries = store.status().unwrap();
        assert_eq!(entries.len(), 1);
        let meta = entries[0].meta.as_ref().unwrap();
        assert_eq!(meta.row_count, 2);
        assert_eq!(meta.first_date, Some(day(2)));
        assert_eq!(meta.data_hash, sample().content_hash());
    }
}
