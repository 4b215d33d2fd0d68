mod common;

use chrono::NaiveDate;
use common::{TestWorkspace, sale, standard_sales, struct_ticket_batch, write_batch};
use sales_api::dataset::{
    DEFAULT_SNAPSHOT_PATTERN, DatasetError, KEY_DATE, SalesTable, discover_snapshots,
    read_snapshot,
};
use sales_api::filter::{DateRange, KeyColumn, filter_by_key, filter_by_key_and_range};
use sales_api::stats::summarize;
use serde_json::json;

fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
}

#[test]
fn discover_snapshots_sorts_and_filters_by_pattern() {
    let workspace = TestWorkspace::new();
    workspace.standard_snapshots();
    workspace.write("data_chunk0003.snappy.parquet.tmp", "partial");

    let found = discover_snapshots(workspace.path(), DEFAULT_SNAPSHOT_PATTERN).expect("discover");
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["data_chunk0001.snappy.parquet", "data_chunk0002.snappy.parquet"]
    );
}

#[test]
fn discover_snapshots_accepts_glob_classes() {
    let workspace = TestWorkspace::new();
    let sales = standard_sales();
    workspace.snapshot("data_chunk1.snappy.parquet", &sales[..1]);
    workspace.snapshot("data_chunk2.snappy.parquet", &sales[1..2]);
    workspace.snapshot("data_chunkA.snappy.parquet", &sales[2..]);

    let single = discover_snapshots(workspace.path(), "data_chunk?.snappy.parquet").expect("discover");
    assert_eq!(single.len(), 3);

    let digits =
        discover_snapshots(workspace.path(), "data_chunk[0-9].snappy.parquet").expect("discover");
    let names: Vec<String> = digits
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["data_chunk1.snappy.parquet", "data_chunk2.snappy.parquet"]);

    let table =
        SalesTable::load(workspace.path(), "data_chunk[0-9].snappy.parquet", false).expect("load");
    assert_eq!(table.len(), 2);
}

#[test]
fn discover_snapshots_skips_matching_directories() {
    let workspace = TestWorkspace::new();
    std::fs::create_dir(workspace.path().join("data_chunk0000.snappy.parquet")).expect("mkdir");
    workspace.standard_snapshots();

    let found = discover_snapshots(workspace.path(), DEFAULT_SNAPSHOT_PATTERN).expect("discover");
    assert_eq!(found.len(), 2);
}

#[test]
fn discover_snapshots_rejects_invalid_patterns() {
    let workspace = TestWorkspace::new();
    assert!(discover_snapshots(workspace.path(), "data_chunk[.parquet").is_err());
}

#[test]
fn load_concatenates_snapshots_in_file_order() {
    let workspace = TestWorkspace::new();
    workspace.standard_snapshots();

    let table = SalesTable::load(workspace.path(), DEFAULT_SNAPSHOT_PATTERN, false).expect("load");
    assert_eq!(table.len(), 4);
    assert_eq!(table.sources().len(), 2);
    assert_eq!(
        table.columns(),
        ["KeyEmployee", "KeyProduct", "KeyStore", "KeyDate", "Tickets"]
    );
    assert_eq!(table.date_span(), Some((day("2023-11-01"), day("2023-11-03"))));

    let first = table.first().expect("first record");
    assert_eq!(first.row()[KEY_DATE], json!("2023-11-01"));
    assert_eq!(
        first.row()["Tickets"],
        json!([{ "NetAmount": 100.0 }, { "NetAmount": 50.0 }])
    );
    assert_eq!(table.records()[3].key(KeyColumn::Employee), Some("2|500"));
}

#[test]
fn load_without_snapshots_is_an_error_unless_allowed() {
    let workspace = TestWorkspace::new();
    workspace.write("readme.txt", "nothing here");

    let err = SalesTable::load(workspace.path(), DEFAULT_SNAPSHOT_PATTERN, false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DatasetError>(),
        Some(DatasetError::NoSnapshots { .. })
    ));

    let table = SalesTable::load(workspace.path(), DEFAULT_SNAPSHOT_PATTERN, true).expect("empty");
    assert!(table.is_empty());
    assert!(table.columns().is_empty());
}

#[test]
fn load_fails_for_missing_directory() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("absent");
    assert!(SalesTable::load(&missing, DEFAULT_SNAPSHOT_PATTERN, true).is_err());
}

#[test]
fn read_snapshot_rejects_files_without_tickets() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("data_chunk0001.snappy.parquet");
    let batch = common::sales_batch(&standard_sales())
        .project(&[0, 1, 2, 3])
        .expect("project");
    write_batch(&path, &batch);

    let err = read_snapshot(&path).unwrap_err();
    match err.downcast_ref::<DatasetError>() {
        Some(DatasetError::MissingColumn { column, .. }) => assert_eq!(column, "Tickets"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn timestamp_dates_and_struct_tickets_are_normalised() {
    let workspace = TestWorkspace::new();
    let sales = vec![
        sale("1|343", "1|44733", "1|023", "2023-11-02", &[12.5]),
        sale("1|343", "1|44733", "1|023", "2023-11-04", &[7.5]),
    ];
    write_batch(
        &workspace.path().join("data_chunk0001.snappy.parquet"),
        &struct_ticket_batch(&sales),
    );

    let table = SalesTable::load(workspace.path(), DEFAULT_SNAPSHOT_PATTERN, false).expect("load");
    assert_eq!(table.records()[0].key_date(), Some(day("2023-11-02")));
    assert_eq!(table.records()[0].row()[KEY_DATE], json!("2023-11-02"));

    let range = DateRange::new(day("2023-11-02"), day("2023-11-02"));
    let selection = filter_by_key_and_range(&table, KeyColumn::Employee, "1|343", &range);
    assert_eq!(selection.len(), 1);

    let summary = summarize(&filter_by_key(&table, KeyColumn::Store, "1|023")).expect("summary");
    assert_eq!(summary.total_sales, "$20.00");
    assert_eq!(summary.average_sales, "$10.00");
}
