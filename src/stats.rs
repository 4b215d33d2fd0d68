use anyhow::{Result, anyhow};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{dataset::SalesRecord, error::ApiError, filter::Selection};

pub const NO_SALES_MESSAGE: &str = "No sales data found.";

/// Total and average net sales, rendered as currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_sales: String,
    pub average_sales: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetTotals {
    pub count: usize,
    pub total: Decimal,
    pub average: Decimal,
}

impl NetTotals {
    /// Sum and arithmetic mean. An empty sequence totals to zero with a zero
    /// average.
    pub fn compute(amounts: &[Decimal]) -> Result<Self> {
        let total = amounts.iter().try_fold(Decimal::ZERO, |acc, amount| {
            acc.checked_add(*amount)
                .ok_or_else(|| anyhow!("Net amount total overflowed"))
        })?;
        let average = if amounts.is_empty() {
            Decimal::ZERO
        } else {
            total
                .checked_div(Decimal::from(amounts.len()))
                .ok_or_else(|| anyhow!("Net amount average overflowed"))?
        };
        Ok(Self {
            count: amounts.len(),
            total,
            average,
        })
    }

    pub fn summary(&self) -> SalesSummary {
        SalesSummary {
            total_sales: format_currency(self.total),
            average_sales: format_currency(self.average),
        }
    }
}

/// Every ticket net amount across `records`, flattened in row order.
pub fn net_amounts<'a, I>(records: I) -> Vec<Decimal>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    records
        .into_iter()
        .flat_map(|record| record.net_amounts().iter().copied())
        .collect()
}

/// Aggregates a selection. A selection over a table without columns has
/// nothing to aggregate and is reported as not found.
pub fn summarize(selection: &Selection<'_>) -> Result<SalesSummary, ApiError> {
    if selection.column_count() == 0 {
        return Err(ApiError::not_found(NO_SALES_MESSAGE));
    }
    let amounts = net_amounts(selection.records().iter().copied());
    Ok(NetTotals::compute(&amounts)?.summary())
}

/// Formats as `$1,234.56`: thousands separators, two decimals, half-even
/// rounding. Negative amounts keep the sign after the symbol.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("${sign}{grouped}.{fraction}")
}
