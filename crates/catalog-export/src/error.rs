//! Error types for exports.

use catalog_model::EntityId;
use catalog_store::StoreError;
use thiserror::Error;

/// Errors that can occur while exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A fact references a variable that no longer exists.
    #[error("Bad variable type, or no variable match: {0}")]
    MissingVariable(EntityId),

    /// A categorical fact references an attribute that no longer exists.
    #[error("Attribute {0} referenced by exported data not found")]
    MissingAttribute(EntityId),

    /// Writing CSV output failed.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing CSV output failed.
    #[error("CSV flush failed: {0}")]
    Io(#[from] std::io::Error),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
