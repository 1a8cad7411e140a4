//! Error types for the imessage-analysis library.
//!
//! Store and file failures surface as [`AnalysisError`] and halt the stage that
//! hit them. Row-level problems are [`MalformedRow`] values: the offending row is
//! skipped and counted, processing continues.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting, resolving or aggregating messages.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A source store exists but could not be opened or queried
    #[error("Cannot access store {path}: {source}")]
    StoreAccess {
        /// Path of the store
        path: PathBuf,
        /// Underlying SQLite failure
        #[source]
        source: rusqlite::Error,
    },

    /// A source store does not exist or is not a regular file
    #[error("Store not found: {0}")]
    StoreMissing(PathBuf),

    /// Database-related errors outside of opening a store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A tabular file lacks a column the stage needs
    #[error("{file}: missing required column '{column}'")]
    MissingColumn {
        /// File that was read
        file: String,
        /// Header label that was not found
        column: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type alias for Result with AnalysisError
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Why a tabular row was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRow {
    /// Row has a different number of fields than the header
    #[error("expected {expected} columns, found {found}")]
    ColumnCount {
        /// Header width
        expected: usize,
        /// Row width
        found: usize,
    },

    /// Readable time column could not be parsed
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// Timestamp column is not a number
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// A 0/1 flag column held something else
    #[error("invalid flag '{0}'")]
    InvalidFlag(String),
}
