//! Flat CSV cache store.
//!
//! One file per cache key: `{dir}/series-{key}.csv` with a `date,SYM1,SYM2,…`
//! header, one row per trading date, ISO-8601 dates, empty cell = missing.
//! The key covers the requested symbol set and the data source, so two
//! dashboards with different symbol sets never share (or clobber) a file.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Corrupt files are treated as absent and quarantined ({name}.quarantined)
//! - Metadata sidecar per key (symbols, date range, source, cached-at)

use crate::table::TimeSeriesTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from writing the store. Reads never error — a missing or corrupt
/// file is reported as absence, which triggers a full refetch upstream.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store CSV error: {0}")]
    Csv(String),

    #[error("store metadata error: {0}")]
    Meta(String),
}

/// Identity of one cached series: the ordered symbol set plus the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(symbols: &[String], source: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source.as_bytes());
        for symbol in symbols {
            hasher.update(b"\0");
            hasher.update(symbol.as_bytes());
        }
        let hex = hasher.finalize().to_hex();
        Self(hex[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Metadata sidecar for a cached series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub key: String,
    pub symbols: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub row_count: usize,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// The CSV cache store.
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn series_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("series-{}.csv", key.as_str()))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("series-{}.meta.json", key.as_str()))
    }

    /// Load the cached table for a key.
    ///
    /// Returns `None` when the file is missing or unreadable, and also when
    /// it is present but corrupt — corruption is indistinguishable from
    /// absence to the caller. A corrupt file is quarantined by rename so the
    /// next save starts clean.
    pub fn load(&self, key: &CacheKey) -> Option<TimeSeriesTable> {
        let path = self.series_path(key);
        if !path.exists() {
            return None;
        }

        match read_csv_table(&path) {
            Ok(table) => Some(table),
            Err(e) => {
                let quarantine = path.with_extension("csv.quarantined");
                eprintln!(
                    "WARNING: quarantining corrupt cache file {}: {e}",
                    path.display()
                );
                let _ = fs::rename(&path, &quarantine);
                None
            }
        }
    }

    /// Persist a table under a key.
    ///
    /// Atomic from a reader's perspective: the table is written to a `.tmp`
    /// sibling and renamed into place, so `load` sees either the full prior
    /// file or the full new one.
    pub fn save(
        &self,
        key: &CacheKey,
        table: &TimeSeriesTable,
        source: &str,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.series_path(key);
        let tmp_path = path.with_extension("csv.tmp");

        write_csv_table(table, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(e)
        })?;

        let meta = StoreMeta {
            key: key.as_str().to_string(),
            symbols: table.symbols().to_vec(),
            start_date: table.first_date(),
            end_date: table.last_date(),
            row_count: table.len(),
            source: source.to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Meta(e.to_string()))?;
        fs::write(self.meta_path(key), json)?;

        Ok(())
    }

    /// Metadata for a key, if cached.
    pub fn meta(&self, key: &CacheKey) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Metadata for every cached series in the store directory.
    pub fn status(&self) -> Vec<StoreMeta> {
        let mut metas = Vec::new();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return metas;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".meta.json") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(entry.path()) {
                if let Ok(meta) = serde_json::from_str::<StoreMeta>(&content) {
                    metas.push(meta);
                }
            }
        }
        metas.sort_by(|a, b| a.key.cmp(&b.key));
        metas
    }
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

fn write_csv_table(table: &TimeSeriesTable, path: &Path) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| StoreError::Csv(e.to_string()))?;

    let mut header = Vec::with_capacity(table.symbols().len() + 1);
    header.push("date".to_string());
    header.extend(table.symbols().iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| StoreError::Csv(e.to_string()))?;

    for (date, row) in table.iter() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        for cell in row {
            record.push(match cell {
                Some(v) => v.to_string(),
                None => String::new(),
            });
        }
        writer
            .write_record(&record)
            .map_err(|e| StoreError::Csv(e.to_string()))?;
    }

    writer.flush().map_err(|e| StoreError::Csv(e.to_string()))?;
    Ok(())
}

fn read_csv_table(path: &Path) -> Result<TimeSeriesTable, StoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::Csv(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| StoreError::Csv(e.to_string()))?
        .clone();
    if headers.get(0) != Some("date") {
        return Err(StoreError::Csv("first column must be 'date'".into()));
    }
    let symbols: Vec<String> = headers.iter().skip(1).map(String::from).collect();

    let mut table = TimeSeriesTable::with_symbols(symbols.clone());
    for record in reader.records() {
        let record = record.map_err(|e| StoreError::Csv(e.to_string()))?;
        let date_str = record
            .get(0)
            .ok_or_else(|| StoreError::Csv("row without date".into()))?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| StoreError::Csv(format!("bad date '{date_str}': {e}")))?;

        table.touch(date);
        for (idx, symbol) in symbols.iter().enumerate() {
            let cell = record
                .get(idx + 1)
                .ok_or_else(|| StoreError::Csv(format!("short row at {date_str}")))?;
            if cell.is_empty() {
                continue;
            }
            let value: f64 = cell
                .parse()
                .map_err(|_| StoreError::Csv(format!("bad value '{cell}' at {date_str}")))?;
            table.set(date, symbol, value);
        }
    }

    Ok(table)
}
