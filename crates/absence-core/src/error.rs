use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the absence dashboard.
///
/// Only structural and configuration problems end up here. Data-quality
/// issues inside individual records are reported as
/// [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
#[derive(Error, Debug)]
pub enum AbsenceError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A weekly timetable is structurally invalid.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A break interval is malformed (negative deduction, end before start).
    #[error("Invalid break interval: {0}")]
    InvalidBreak(String),

    /// A single period has `start >= end`.
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// The expected data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No record files were found under the given directory.
    #[error("No record files found in {0}")]
    NoDataFiles(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the absence crates.
pub type Result<T> = std::result::Result<T, AbsenceError>;
