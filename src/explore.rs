//! Terminal counterparts of the query endpoints.

use anyhow::Result;
use log::info;

use crate::{
    cli::{DataArgs, SearchArgs, TotalsArgs},
    dataset::{KEY_DATE, KEY_EMPLOYEE, KEY_PRODUCT, KEY_STORE, SalesTable},
    error::ApiError,
    filter::{self, DateRange, KeyColumn},
    stats::{self, NetTotals},
    table::{Align, print_table},
};

fn load_table(args: &DataArgs) -> Result<SalesTable> {
    let settings = args.settings()?;
    SalesTable::load(
        &settings.data.directory,
        &settings.data.pattern,
        settings.data.allow_empty,
    )
}

pub fn probe(args: &DataArgs) -> Result<()> {
    let table = load_table(args)?;
    let span = table
        .date_span()
        .map(|(lo, hi)| format!("{lo} .. {hi}"))
        .unwrap_or_else(|| "-".to_string());
    let rows = vec![
        vec!["snapshots".to_string(), table.sources().len().to_string()],
        vec!["rows".to_string(), table.len().to_string()],
        vec!["columns".to_string(), table.columns().join(", ")],
        vec!["dates".to_string(), span],
    ];
    print_table(&["property", "value"], &[], &rows);
    Ok(())
}

pub fn search(args: &SearchArgs) -> Result<()> {
    let range = DateRange::parse(&args.start_date, &args.end_date)?;
    let table = load_table(&args.data)?;
    let selection = filter::filter_by_key_and_range(&table, args.entity, &args.key, &range);
    if selection.is_empty() {
        return Err(ApiError::not_found(format!(
            "No sales data found for the given {} and date range.",
            args.entity.entity()
        ))
        .into());
    }
    info!(
        "{} row(s) for {} '{}' between {} and {}",
        selection.len(),
        args.entity,
        args.key,
        range.start,
        range.end
    );

    let mut rows = Vec::with_capacity(selection.len());
    for record in selection.records() {
        let totals = NetTotals::compute(record.net_amounts())?;
        rows.push(vec![
            record
                .key_date()
                .map(|date| date.to_string())
                .unwrap_or_default(),
            record.key(KeyColumn::Employee).unwrap_or_default().to_string(),
            record.key(KeyColumn::Product).unwrap_or_default().to_string(),
            record.key(KeyColumn::Store).unwrap_or_default().to_string(),
            totals.count.to_string(),
            stats::format_currency(totals.total),
        ]);
    }
    print_table(
        &[KEY_DATE, KEY_EMPLOYEE, KEY_PRODUCT, KEY_STORE, "tickets", "net"],
        &[
            Align::Left,
            Align::Left,
            Align::Left,
            Align::Left,
            Align::Right,
            Align::Right,
        ],
        &rows,
    );
    Ok(())
}

pub fn totals(args: &TotalsArgs) -> Result<()> {
    let table = load_table(&args.data)?;
    let selection = filter::filter_by_key(&table, args.entity, &args.key);
    let summary = stats::summarize(&selection)?;
    print_table(
        &[args.entity.column_name(), "rows", "total_sales", "average_sales"],
        &[Align::Left, Align::Right, Align::Right, Align::Right],
        &[vec![
            args.key.clone(),
            selection.len().to_string(),
            summary.total_sales,
            summary.average_sales,
        ]],
    );
    Ok(())
}
