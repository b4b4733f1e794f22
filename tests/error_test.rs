//! Tests for error types

use std::io::Cursor;
use xplor_distros::storage::MetadataTable;
use xplor_distros::{Config, Error};

#[test]
fn test_storage_error() {
    let error = Error::StorageError("md.tsv has no header row".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("md.tsv"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("number of samples must be greater than 0".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("number of samples"));
}

#[test]
fn test_render_error() {
    let error = Error::Render("chart has no rows".to_string());
    assert_eq!(format!("{error}"), "Render error: chart has no rows");
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_ragged_row_is_csv_error() {
    let data = "id\tage\ns1\t1\ns2\t2\t3\n";
    let error = MetadataTable::read_tsv("ragged.tsv", Cursor::new(data)).unwrap_err();
    assert!(matches!(error, Error::Csv(_)));
    assert!(format!("{error}").contains("tab-separated fields"));
}

#[test]
fn test_missing_file_is_fatal() {
    let error = MetadataTable::load("does/not/exist.tsv").unwrap_err();
    assert!(format!("{error}").contains("does/not/exist.tsv"));
}

#[test]
fn test_config_error() {
    let error = Config::builder("out.html").build().unwrap_err();
    assert!(matches!(error, Error::InvalidInput(_)));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    let error_str = format!("{error}");
    assert_eq!(error_str, "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::Render("x".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Render"));
}

#[test]
fn test_result_type_alias() {
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> xplor_distros::Result<i32> {
        Ok(42)
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> xplor_distros::Result<i32> {
        Err(Error::Other("test error".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
