use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::{
    data,
    dataset::{self, Row, SalesRecord, SalesTable},
    error::ApiError,
};

/// The identifier columns a client may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum KeyColumn {
    Employee,
    Product,
    Store,
}

impl KeyColumn {
    pub const ALL: [KeyColumn; 3] = [KeyColumn::Employee, KeyColumn::Product, KeyColumn::Store];

    pub fn column_name(self) -> &'static str {
        match self {
            KeyColumn::Employee => dataset::KEY_EMPLOYEE,
            KeyColumn::Product => dataset::KEY_PRODUCT,
            KeyColumn::Store => dataset::KEY_STORE,
        }
    }

    /// Lower-case entity name used in paths and messages.
    pub fn entity(self) -> &'static str {
        match self {
            KeyColumn::Employee => "employee",
            KeyColumn::Product => "product",
            KeyColumn::Store => "store",
        }
    }

    pub fn query_param(self) -> &'static str {
        match self {
            KeyColumn::Employee => "key_employee",
            KeyColumn::Product => "key_product",
            KeyColumn::Store => "key_store",
        }
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Inclusive calendar-date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Validates two `YYYY-MM-DD` strings. Either one failing yields
    /// [`ApiError::InvalidDate`].
    pub fn parse(start: &str, end: &str) -> Result<Self, ApiError> {
        let start = data::parse_request_date(start).map_err(|_| ApiError::InvalidDate)?;
        let end = data::parse_request_date(end).map_err(|_| ApiError::InvalidDate)?;
        Ok(Self::new(start, end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Rows picked out of a [`SalesTable`], in table order.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    columns: &'a [String],
    records: Vec<&'a SalesRecord>,
}

impl<'a> Selection<'a> {
    pub fn records(&self) -> &[&'a SalesRecord] {
        &self.records
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.records.iter().copied().map(SalesRecord::row)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

fn select<'a, F>(table: &'a SalesTable, predicate: F) -> Selection<'a>
where
    F: Fn(&SalesRecord) -> bool,
{
    Selection {
        columns: table.columns(),
        records: table.records().iter().filter(|&record| predicate(record)).collect(),
    }
}

/// Rows whose key column equals `key` exactly.
pub fn filter_by_key<'a>(table: &'a SalesTable, column: KeyColumn, key: &str) -> Selection<'a> {
    select(table, |record| record.key(column) == Some(key))
}

/// Rows whose key column equals `key` and whose `KeyDate` falls in `range`.
pub fn filter_by_key_and_range<'a>(
    table: &'a SalesTable,
    column: KeyColumn,
    key: &str,
    range: &DateRange,
) -> Selection<'a> {
    select(table, |record| {
        record.key(column) == Some(key) && record.key_date().is_some_and(|d| range.contains(d))
    })
}
