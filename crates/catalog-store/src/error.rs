//! Storage error types.

use std::path::PathBuf;

use catalog_model::{EntityId, EntityType, ModelError};
use thiserror::Error;

/// Errors raised by catalog stores, the repository and publish.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named catalog does not exist.
    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    /// No entity with the id exists.
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: EntityType, id: EntityId },

    /// An entity id is already taken in the catalog.
    #[error("Entity id {0} already exists")]
    DuplicateId(EntityId),

    /// An entity is not valid for the requested operation.
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// A data filter carries an invalid id.
    #[error("Invalid filter parameters. Bad id: {0}")]
    InvalidFilter(EntityId),

    /// Model conversion failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The store lock was poisoned by a panicking writer.
    #[error("Catalog store lock poisoned")]
    LockPoisoned,

    /// Catalog file I/O error.
    #[error("Failed to {operation} catalog file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file could not be encoded or decoded.
    #[error("Invalid catalog file {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Catalog file written by a newer version.
    #[error("Catalog file version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },

    /// Failure reported by a storage backend.
    #[error("{0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
