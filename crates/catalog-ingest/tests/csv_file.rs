//! Reading CSV files from disk.

use std::io::Write;

use catalog_ingest::{CsvReadOptions, CsvRowSource, IngestError, RawRow, RawValue};
use tempfile::NamedTempFile;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

#[test]
fn streams_rows_from_file() {
    let file = csv_file("Location,Year,Percent\nMA,2012,45%\nNY,2013,$1,000\n");
    let source = CsvRowSource::open(file.path(), &CsvReadOptions::default()).expect("open");
    assert_eq!(source.headers(), ["Location", "Year", "Percent"]);

    let rows: Vec<_> = source.collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].as_ref().unwrap().get("Percent"),
        Some(&RawValue::from("45%"))
    );
    // Unquoted comma yields an extra field.
    assert!(rows[1].is_err());
}

#[test]
fn quoted_cells_keep_delimiters() {
    let file = csv_file("Location,Percent\nMA,\"$1,000\"\n");
    let rows: Vec<RawRow> = CsvRowSource::open(file.path(), &CsvReadOptions::default())
        .expect("open")
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(rows[0].get("Percent"), Some(&RawValue::from("$1,000")));
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.csv");
    let result = CsvRowSource::open(&path, &CsvReadOptions::default());
    assert!(matches!(result, Err(IngestError::FileNotFound { .. })));
}

#[test]
fn rows_are_read_lazily() {
    let file = csv_file("A\n1\n2\n3\n");
    let mut source = CsvRowSource::open(file.path(), &CsvReadOptions::default()).expect("open");
    let first = source.next().expect("first row").expect("valid row");
    assert_eq!(first.get("A"), Some(&RawValue::from("1")));
    assert_eq!(source.count(), 2);
}
