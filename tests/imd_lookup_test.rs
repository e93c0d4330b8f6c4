//! IMD lookup loading: accepted schemas, deduplication, mismatch errors.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int8Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use hes_spells::{EtlError, ImdLookup, write_parquet};

fn write_lookup(path: &Path, lsoa_column: &str, codes: &[&str], quintiles: &[i8]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new(lsoa_column, DataType::Utf8, true),
        Field::new("imd_quintile", DataType::Int8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(codes.to_vec())),
        Arc::new(Int8Array::from(quintiles.to_vec())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    write_parquet(path, schema, &[batch]).unwrap();
}

#[test]
fn lookup_accepts_either_geography_column_name() {
    let dir = tempfile::tempdir().unwrap();

    let upper = dir.path().join("upper.parquet");
    write_lookup(&upper, "LSOA11", &["E01000001"], &[3]);
    let lookup = ImdLookup::from_parquet(&upper).unwrap();
    assert_eq!(lookup.get("E01000001"), Some(3));

    let lower = dir.path().join("lower.parquet");
    write_lookup(&lower, "lsoa11_code", &["E01000002"], &[5]);
    let lookup = ImdLookup::from_parquet(&lower).unwrap();
    assert_eq!(lookup.get("E01000002"), Some(5));
}

#[test]
fn duplicate_codes_are_deduplicated_first_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dupes.parquet");
    write_lookup(
        &path,
        "LSOA11",
        &["E01000001", "E01000001", "E01000002"],
        &[1, 4, 2],
    );

    let lookup = ImdLookup::from_parquet(&path).unwrap();
    assert_eq!(lookup.len(), 2);
    assert_eq!(lookup.get("E01000001"), Some(1));
    assert_eq!(lookup.get("E01000002"), Some(2));
}

#[test]
fn missing_quintile_column_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.parquet");

    let schema = Arc::new(Schema::new(vec![Field::new(
        "LSOA11",
        DataType::Utf8,
        true,
    )]));
    let columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(vec!["E01000001"]))];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    write_parquet(&path, schema, &[batch]).unwrap();

    let err = ImdLookup::from_parquet(&path).unwrap_err();
    assert!(matches!(err, EtlError::Schema(_)));
}

#[test]
fn unknown_codes_stay_unmatched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lookup.parquet");
    write_lookup(&path, "LSOA11", &["E01000001"], &[2]);

    let lookup = ImdLookup::from_parquet(&path).unwrap();
    assert_eq!(lookup.get("E09999999"), None);
}
