//! Error handling for the HES spell pipelines.

use std::path::PathBuf;

/// Specialized error type for the ETL pipelines.
///
/// Only structural problems are fatal: missing input files, an empty
/// combined table, or a lookup/spreadsheet without the required columns.
/// Field-level problems (unparseable dates, unmatched LSOA codes, missing
/// categorical values) never surface here; they propagate as nulls.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading or decoding CSV/Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error reading the IMD spreadsheet
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    /// Directory mode found nothing to read
    #[error("No CSV files found under: {}", .path.display())]
    NoInputFiles { path: PathBuf },

    /// A required column is missing from an input table
    #[error("Schema error: {0}")]
    Schema(String),

    /// The combined episode table has zero rows after column restriction
    #[error("Loaded an empty table after column restriction: {0}")]
    EmptyInput(String),
}

/// Result type for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;
