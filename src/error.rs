//! Error types for Xplor-Distros
//!
//! Only fatal conditions live here. Rejected stratification columns and
//! undersized groups are recorded in the [`DiagnosticsLog`](crate::diagnostics::DiagnosticsLog)
//! instead and never abort a run.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Xplor-Distros error types
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata file could not be turned into a table
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration or table operation received unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Chart could not be composed or written
    #[error("Render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited file
    #[error("Delimited file error: {0}\nEvery row must have as many tab-separated fields as the header")]
    Csv(#[from] csv::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
