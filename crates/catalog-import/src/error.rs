//! Error types for imports.

use catalog_ingest::IngestError;
use catalog_map::MapError;
use catalog_store::StoreError;
use thiserror::Error;

/// Why a single row could not become an individual.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowErrorKind {
    /// Column without a usable variable.
    #[error("Invalid mapping for column: {column}")]
    InvalidColumn { column: String },

    /// Categorical value that matches no attribute key.
    #[error("Invalid mapping for attribute: {variable}: {value}")]
    InvalidAttribute { variable: String, value: String },

    /// Numerical cell that does not clean to a finite number.
    #[error("Non-numerical value for numerical variable: {variable}: {value}")]
    NonNumerical { variable: String, value: String },
}

impl RowErrorKind {
    /// Short label without cell data, for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidColumn { .. } => "invalid column",
            Self::InvalidAttribute { .. } => "invalid attribute",
            Self::NonNumerical { .. } => "non-numerical value",
        }
    }
}

/// A failed row with its 1-based ordinal in the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error: Row {row}. {kind}")]
pub struct RowError {
    pub row: u64,
    pub kind: RowErrorKind,
}

impl RowError {
    pub fn new(row: u64, kind: RowErrorKind) -> Self {
        Self { row, kind }
    }
}

/// Errors that can occur during an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Batch size of zero.
    #[error("Invalid batch size {0}. The batch size must be at least 1.")]
    InvalidBatchSize(usize),

    /// Commit or rollback on a scope whose transaction already ended.
    #[error("Transaction already ended")]
    TransactionEnded,

    /// A row failed to transform.
    #[error(transparent)]
    Row(#[from] RowError),

    /// Mapping precondition or resolution failed.
    #[error(transparent)]
    Map(#[from] MapError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The row source failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
