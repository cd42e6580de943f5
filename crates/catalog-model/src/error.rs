//! Error types for the catalog model.

use thiserror::Error;

use crate::entity::EntityType;

/// Errors raised while building or converting model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Unknown entity type name.
    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),

    /// Unknown variable type name.
    #[error("Invalid variable type: {0}")]
    InvalidVariableType(String),

    /// An entity was converted to the wrong concrete type.
    #[error("expected {expected} entity, found {found}")]
    UnexpectedEntityType {
        expected: EntityType,
        found: EntityType,
    },

    /// A fact does not fit the variable it is attached to.
    #[error("fact for variable {variable} does not match variable type {expected}")]
    FactTypeMismatch { variable: u64, expected: String },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
