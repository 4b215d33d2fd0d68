//! Cell-level helpers shared by the loader, the filter, and the aggregator.
//!
//! Snapshot rows arrive as JSON objects (one per Parquet row). The helpers here
//! turn individual cells into the typed values the query layer works with:
//! key text, calendar dates, and the decimal net amounts nested in `Tickets`.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";
pub const NET_AMOUNT: &str = "NetAmount";

/// Parses a date supplied by a client. Only `YYYY-MM-DD` is accepted.
pub fn parse_request_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, REQUEST_DATE_FORMAT)
        .with_context(|| format!("Failed to parse '{value}' as YYYY-MM-DD"))
}

/// Parses a stored date representation and truncates it to the calendar day.
pub fn parse_stored_date(value: &str) -> Result<NaiveDate> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, REQUEST_DATE_FORMAT) {
        return Ok(date);
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.date());
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.date_naive());
    }
    Err(anyhow!("Failed to parse '{value}' as a date or timestamp"))
}

/// Coerces a `KeyDate` cell to a calendar date. Null cells stay empty.
pub fn coerce_calendar_date(cell: &Value) -> Result<Option<NaiveDate>> {
    match cell {
        Value::Null => Ok(None),
        Value::String(raw) => parse_stored_date(raw).map(Some),
        other => bail!("Unsupported date cell {other}"),
    }
}

/// Renders a key cell as the text clients compare against.
pub fn key_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn decimal_from_cell(cell: &Value) -> Result<Option<Decimal>> {
    match cell {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(Decimal::from(i)));
            }
            let float = n
                .as_f64()
                .ok_or_else(|| anyhow!("Number {n} is out of range"))?;
            Decimal::from_f64(float)
                .map(Some)
                .ok_or_else(|| anyhow!("Number {n} cannot be represented as a decimal"))
        }
        Value::String(raw) => {
            let trimmed = raw.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map(Some)
                .with_context(|| format!("Failed to parse '{raw}' as a decimal"))
        }
        other => bail!("Unsupported amount cell {other}"),
    }
}

/// Flattens a `Tickets` cell into its net amounts.
///
/// The cell may hold one ticket object, a list of ticket objects, or null.
/// Tickets whose `NetAmount` is null contribute nothing.
pub fn ticket_amounts(cell: &Value) -> Result<Vec<Decimal>> {
    match cell {
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(ticket_amount(cell)?.into_iter().collect()),
        Value::Array(entries) => {
            let mut amounts = Vec::with_capacity(entries.len());
            for (idx, entry) in entries.iter().enumerate() {
                if entry.is_null() {
                    continue;
                }
                if let Some(amount) =
                    ticket_amount(entry).with_context(|| format!("Ticket #{}", idx + 1))?
                {
                    amounts.push(amount);
                }
            }
            Ok(amounts)
        }
        other => bail!("Unsupported Tickets cell {other}"),
    }
}

fn ticket_amount(ticket: &Value) -> Result<Option<Decimal>> {
    let Value::Object(fields) = ticket else {
        bail!("Ticket entry is not an object: {ticket}");
    };
    let amount = fields
        .get(NET_AMOUNT)
        .ok_or_else(|| anyhow!("Ticket entry has no {NET_AMOUNT} field"))?;
    decimal_from_cell(amount).with_context(|| format!("Reading {NET_AMOUNT}"))
}
