//! Snapshot discovery and the in-memory sales table.
//!
//! A data directory holds immutable `data_chunk*.snappy.parquet` snapshots.
//! [`SalesTable::load`] reads every matching file once, in file-name order,
//! and concatenates the rows into a table that stays fixed for the lifetime of
//! the process. `KeyDate` is coerced to a calendar date and the nested
//! `Tickets` amounts are extracted while loading, so readers never mutate the
//! table.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use arrow::json::WriterBuilder;
use arrow::json::writer::JsonArray;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{data, filter::KeyColumn};

pub const DEFAULT_SNAPSHOT_PATTERN: &str = "data_chunk*.snappy.parquet";
pub const KEY_EMPLOYEE: &str = "KeyEmployee";
pub const KEY_PRODUCT: &str = "KeyProduct";
pub const KEY_STORE: &str = "KeyStore";
pub const KEY_DATE: &str = "KeyDate";
pub const TICKETS: &str = "Tickets";

const REQUIRED_COLUMNS: &[&str] = &[KEY_EMPLOYEE, KEY_PRODUCT, KEY_STORE, KEY_DATE, TICKETS];

pub type Row = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("No snapshot files matching '{pattern}' found in {directory:?}")]
    NoSnapshots { directory: PathBuf, pattern: String },
    #[error("Snapshot {path:?} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Row is missing required column '{column}'")]
    MissingCell { column: String },
}

/// One sales row: typed keys for filtering plus the row as loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    key_employee: Option<String>,
    key_product: Option<String>,
    key_store: Option<String>,
    key_date: Option<NaiveDate>,
    net_amounts: Vec<Decimal>,
    row: Row,
}

impl SalesRecord {
    /// Builds a record from a raw row, rewriting `KeyDate` as `YYYY-MM-DD`.
    pub fn from_row(mut row: Row) -> Result<Self> {
        let key_date = data::coerce_calendar_date(required_cell(&row, KEY_DATE)?)
            .with_context(|| format!("Coercing {KEY_DATE}"))?;
        let net_amounts = data::ticket_amounts(required_cell(&row, TICKETS)?)
            .with_context(|| format!("Reading {TICKETS}"))?;
        let key_employee = data::key_text(required_cell(&row, KEY_EMPLOYEE)?);
        let key_product = data::key_text(required_cell(&row, KEY_PRODUCT)?);
        let key_store = data::key_text(required_cell(&row, KEY_STORE)?);
        if let Some(date) = key_date {
            row.insert(
                KEY_DATE.to_string(),
                Value::String(date.format(data::REQUEST_DATE_FORMAT).to_string()),
            );
        }
        Ok(Self {
            key_employee,
            key_product,
            key_store,
            key_date,
            net_amounts,
            row,
        })
    }

    pub fn key(&self, column: KeyColumn) -> Option<&str> {
        match column {
            KeyColumn::Employee => self.key_employee.as_deref(),
            KeyColumn::Product => self.key_product.as_deref(),
            KeyColumn::Store => self.key_store.as_deref(),
        }
    }

    pub fn key_date(&self) -> Option<NaiveDate> {
        self.key_date
    }

    pub fn net_amounts(&self) -> &[Decimal] {
        &self.net_amounts
    }

    pub fn row(&self) -> &Row {
        &self.row
    }
}

fn required_cell<'a>(row: &'a Row, column: &str) -> Result<&'a Value, DatasetError> {
    row.get(column).ok_or_else(|| DatasetError::MissingCell {
        column: column.to_string(),
    })
}

/// The concatenation of every snapshot, in load order.
#[derive(Debug, Clone, Default)]
pub struct SalesTable {
    columns: Vec<String>,
    records: Vec<SalesRecord>,
    sources: Vec<PathBuf>,
}

impl SalesTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from rows that are already in memory.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut table = Self::empty();
        for (idx, row) in rows.into_iter().enumerate() {
            table
                .push_row(row)
                .with_context(|| format!("Row {}", idx + 1))?;
        }
        Ok(table)
    }

    /// Loads every snapshot in `directory` whose file name matches `pattern`.
    ///
    /// Finding no snapshot is an error unless `allow_empty` is set, in which
    /// case the table is empty and has no columns.
    pub fn load(directory: &Path, pattern: &str, allow_empty: bool) -> Result<Self> {
        let sources = discover_snapshots(directory, pattern)?;
        if sources.is_empty() {
            if allow_empty {
                warn!(
                    "No snapshot files matching '{pattern}' in {directory:?}; serving an empty table"
                );
                return Ok(Self::empty());
            }
            return Err(DatasetError::NoSnapshots {
                directory: directory.to_path_buf(),
                pattern: pattern.to_string(),
            }
            .into());
        }

        let mut table = Self::empty();
        for path in &sources {
            let rows = read_snapshot(path)?;
            debug!("Read {} row(s) from {:?}", rows.len(), path);
            for (idx, row) in rows.into_iter().enumerate() {
                table
                    .push_row(row)
                    .with_context(|| format!("Row {} of {path:?}", idx + 1))?;
            }
        }
        table.sources = sources;
        info!(
            "Loaded {} row(s) with {} column(s) from {} snapshot(s) in {:?}",
            table.len(),
            table.columns.len(),
            table.sources.len(),
            directory
        );
        Ok(table)
    }

    fn push_row(&mut self, row: Row) -> Result<()> {
        for name in row.keys() {
            if !self.columns.iter().any(|existing| existing == name) {
                self.columns.push(name.clone());
            }
        }
        self.records.push(SalesRecord::from_row(row)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn first(&self) -> Option<&SalesRecord> {
        self.records.first()
    }

    /// Earliest and latest `KeyDate` in the table.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(SalesRecord::key_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), date| {
            (lo.min(date), hi.max(date))
        }))
    }
}

/// Lists the regular files in `directory` matching the glob `pattern`, sorted
/// by path. The directory itself is taken literally.
pub fn discover_snapshots(directory: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !fs::metadata(directory)
        .with_context(|| format!("Listing data directory {directory:?}"))?
        .is_dir()
    {
        bail!("Data directory {directory:?} is not a directory");
    }
    let root = glob::Pattern::escape(&directory.to_string_lossy());
    let full = Path::new(&root).join(pattern);
    let full = full.to_string_lossy();
    let mut paths = Vec::new();
    for entry in glob::glob(&full).with_context(|| format!("Invalid snapshot pattern '{pattern}'"))? {
        let path = entry.with_context(|| format!("Listing data directory {directory:?}"))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads one Parquet snapshot into JSON rows.
pub fn read_snapshot(path: &Path) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("Opening snapshot {path:?}"))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Reading Parquet metadata from {path:?}"))?;
    let schema = builder.schema().clone();
    for column in REQUIRED_COLUMNS {
        if schema.field_with_name(column).is_err() {
            return Err(DatasetError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            }
            .into());
        }
    }
    let reader = builder
        .build()
        .with_context(|| format!("Opening record batches in {path:?}"))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.with_context(|| format!("Decoding record batch from {path:?}"))?;
        rows.extend(
            batch_to_rows(&batch).with_context(|| format!("Converting rows from {path:?}"))?,
        );
    }
    Ok(rows)
}

fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    writer.write_batches(&[batch])?;
    writer.finish()?;
    let buffer = writer.into_inner();
    Ok(serde_json::from_slice(&buffer)?)
}
