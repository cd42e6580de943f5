//! Error types for mapping resolution and analysis.

use std::fmt;

use catalog_ingest::IngestError;
use catalog_model::EntityId;
use catalog_store::StoreError;
use thiserror::Error;

/// One mapping entry that contradicts the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// A listed attribute belongs to another variable.
    ForeignAttribute {
        variable: EntityId,
        attribute: EntityId,
        owner: EntityId,
    },
    /// A variable is local to another data set.
    ForeignScope {
        variable: EntityId,
        scoped_data_set: EntityId,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignAttribute {
                variable,
                attribute,
                owner,
            } => write!(
                f,
                "{variable}/{attribute} (attribute belongs to variable {owner})"
            ),
            Self::ForeignScope {
                variable,
                scoped_data_set,
            } => write!(f, "{variable} (variable is local to data set {scoped_data_set})"),
        }
    }
}

/// Errors raised while resolving mappings or analyzing columns.
#[derive(Debug, Error)]
pub enum MapError {
    /// Schema mode with no entries.
    #[error("Invalid schema. The schema must list at least one variable.")]
    EmptySchema,

    /// Column-mapping mode with no columns.
    #[error("Invalid column mapping. At least one column must be mapped.")]
    EmptyColumnMapping,

    /// The data set has no stored schema to import against.
    #[error("Invalid Data Set Schema. The Schema must be configured before importing data.")]
    MissingDataSetSchema { data_set: EntityId },

    /// Mapping entries contradict the catalog; every offender is listed.
    #[error("Invalid mapping: {}", join(.0))]
    Consistency(Vec<Inconsistency>),

    /// Single-column analysis asked for a column the data lacks.
    #[error("Data file does not contain column {0}")]
    MissingColumn(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

fn join(problems: &[Inconsistency]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MapError>;
