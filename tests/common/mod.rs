#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Array, Float64Array, ListArray, StringArray, StructArray,
    TimestampMillisecondArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tempfile::{TempDir, tempdir};

pub const SECRET: &str = "integration-secret";
pub const EMAIL: &str = "test@mail.com";
pub const PASSWORD: &str = "Test123";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a Snappy-compressed snapshot with list-shaped tickets.
    pub fn snapshot(&self, name: &str, sales: &[Sale]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        write_batch(&path, &sales_batch(sales));
        path
    }

    /// The usual two-chunk fixture plus a file the snapshot pattern skips.
    pub fn standard_snapshots(&self) {
        let sales = standard_sales();
        self.snapshot("data_chunk0001.snappy.parquet", &sales[..2]);
        self.snapshot("data_chunk0002.snappy.parquet", &sales[2..]);
        self.snapshot("archive.parquet", &[sale("9|999", "9|999", "9|999", "2023-11-01", &[1.0])]);
    }

    /// Config file with one user and the integration secret.
    pub fn config(&self) -> PathBuf {
        let contents = format!(
            "data:\n  directory: {:?}\nauth:\n  token_secret: {SECRET}\n  users:\n    - email: {EMAIL}\n      password_sha256: {}\n",
            self.path(),
            sales_api::auth::hash_password(PASSWORD)
        );
        self.write("sales-api.yaml", &contents)
    }
}

#[derive(Debug, Clone)]
pub struct Sale {
    pub employee: String,
    pub product: String,
    pub store: String,
    pub date: NaiveDate,
    pub amounts: Vec<f64>,
}

pub fn sale(employee: &str, product: &str, store: &str, date: &str, amounts: &[f64]) -> Sale {
    Sale {
        employee: employee.to_string(),
        product: product.to_string(),
        store: store.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("fixture date"),
        amounts: amounts.to_vec(),
    }
}

/// Employee `1|343` totals $1,650.50 over four tickets; product `1|44733`
/// totals $1,670.00 over four tickets.
pub fn standard_sales() -> Vec<Sale> {
    vec![
        sale("1|343", "1|44733", "1|023", "2023-11-01", &[100.0, 50.0]),
        sale("1|343", "1|44733", "1|023", "2023-11-02", &[1500.0]),
        sale("1|343", "1|10001", "1|023", "2023-11-03", &[0.5]),
        sale("2|500", "1|44733", "1|024", "2023-11-02", &[20.0]),
    ]
}

fn key_fields() -> Vec<Field> {
    vec![
        Field::new("KeyEmployee", DataType::Utf8, true),
        Field::new("KeyProduct", DataType::Utf8, true),
        Field::new("KeyStore", DataType::Utf8, true),
    ]
}

fn key_columns(sales: &[Sale]) -> Vec<ArrayRef> {
    vec![
        Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.employee.as_str()))) as ArrayRef,
        Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.product.as_str()))) as ArrayRef,
        Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.store.as_str()))) as ArrayRef,
    ]
}

fn ticket_fields() -> Fields {
    Fields::from(vec![Field::new("NetAmount", DataType::Float64, true)])
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch");
    (date - epoch).num_days() as i32
}

/// `KeyDate` as Date32 and `Tickets` as `List<Struct<NetAmount>>`.
pub fn sales_batch(sales: &[Sale]) -> RecordBatch {
    let amounts: Vec<f64> = sales.iter().flat_map(|s| s.amounts.iter().copied()).collect();
    let tickets = StructArray::new(
        ticket_fields(),
        vec![Arc::new(Float64Array::from(amounts)) as ArrayRef],
        None,
    );
    let item = Arc::new(Field::new("item", DataType::Struct(ticket_fields()), true));
    let lists = ListArray::new(
        item.clone(),
        OffsetBuffer::from_lengths(sales.iter().map(|s| s.amounts.len())),
        Arc::new(tickets),
        None,
    );

    let mut fields = key_fields();
    fields.push(Field::new("KeyDate", DataType::Date32, true));
    fields.push(Field::new("Tickets", DataType::List(item), true));

    let mut columns = key_columns(sales);
    columns.push(Arc::new(Date32Array::from_iter_values(
        sales.iter().map(|s| days_since_epoch(s.date)),
    )));
    columns.push(Arc::new(lists));
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).expect("sales batch")
}

/// `KeyDate` as a millisecond timestamp at 08:15 and `Tickets` as a single
/// struct holding the first amount of each sale.
pub fn struct_ticket_batch(sales: &[Sale]) -> RecordBatch {
    let first_amounts: Vec<Option<f64>> = sales.iter().map(|s| s.amounts.first().copied()).collect();
    let tickets = StructArray::new(
        ticket_fields(),
        vec![Arc::new(Float64Array::from(first_amounts)) as ArrayRef],
        None,
    );
    let stamps: Vec<i64> = sales
        .iter()
        .map(|s| {
            s.date
                .and_hms_opt(8, 15, 0)
                .expect("fixture time")
                .and_utc()
                .timestamp_millis()
        })
        .collect();

    let mut fields = key_fields();
    fields.push(Field::new(
        "KeyDate",
        DataType::Timestamp(TimeUnit::Millisecond, None),
        true,
    ));
    fields.push(Field::new("Tickets", DataType::Struct(ticket_fields()), true));

    let mut columns = key_columns(sales);
    columns.push(Arc::new(TimestampMillisecondArray::from(stamps)));
    columns.push(Arc::new(tickets));
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).expect("struct ticket batch")
}

pub fn write_batch(path: &Path, batch: &RecordBatch) {
    let file = File::create(path).expect("create snapshot");
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).expect("writer");
    writer.write(batch).expect("write batch");
    writer.close().expect("close writer");
}
