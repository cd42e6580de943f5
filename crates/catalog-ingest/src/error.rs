//! Error types for raw row ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading raw rows.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Source file not found.
    #[error("data file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to open or read a source file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Header row missing or unreadable.
    #[error("failed to read CSV headers from {source_name}: {source}")]
    Headers {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    /// Two header cells share a name.
    #[error("duplicate column '{column}' in {source_name}")]
    DuplicateColumn { source_name: String, column: String },

    /// A data record could not be parsed.
    #[error("failed to read row {row} of {source_name}: {source}")]
    Record {
        source_name: String,
        row: u64,
        #[source]
        source: csv::Error,
    },

    /// Delimiter is not a single ASCII character.
    #[error("invalid CSV delimiter '{0}'")]
    InvalidDelimiter(char),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
