//! Import options.

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// What to do with a source column that has no mapping entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnmappedColumnPolicy {
    /// Skip the cell.
    #[default]
    Ignore,
    /// Fail the row.
    Reject,
}

/// What to do with a row that fails to transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowErrorPolicy {
    /// Roll back the whole import.
    #[default]
    Abort,
    /// Log the row, count it and continue.
    Skip,
}

/// Options controlling an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportOptions {
    /// Individuals written per `create_facts` call.
    /// Defaults to 500.
    pub batch_size: usize,

    /// Create attributes for unknown categorical values instead of failing
    /// the row.
    pub create_missing_attributes: bool,

    pub unmapped_columns: UnmappedColumnPolicy,

    pub row_errors: RowErrorPolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: 500,
            create_missing_attributes: false,
            unmapped_columns: UnmappedColumnPolicy::default(),
            row_errors: RowErrorPolicy::default(),
        }
    }
}

impl ImportOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_create_missing_attributes(mut self, enabled: bool) -> Self {
        self.create_missing_attributes = enabled;
        self
    }

    pub fn with_unmapped_columns(mut self, policy: UnmappedColumnPolicy) -> Self {
        self.unmapped_columns = policy;
        self
    }

    pub fn with_row_errors(mut self, policy: RowErrorPolicy) -> Self {
        self.row_errors = policy;
        self
    }

    /// Checks the options before any transaction is opened.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ImportError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}
