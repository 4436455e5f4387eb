use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, UnifierError>;

/// Error type covering the different failure cases that can occur when the
/// pipeline lists, extracts, aggregates, or persists payroll data.
#[derive(Debug, Error)]
pub enum UnifierError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a report fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the workbook reader implementation.
    #[error("workbook read error: {0}")]
    WorkbookRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from the delimited-text layer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when a classification pattern fails to compile.
    #[error("invalid classification pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Raised when a period argument is not a month number or bonus token.
    #[error("invalid period '{0}' (expected 01-12)")]
    InvalidPeriod(String),

    /// Raised when a source file could not be downloaded.
    #[error("download failed for '{name}': {reason}")]
    Download { name: String, reason: String },

    /// Raised when the extraction worker pool cannot be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input folder not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
