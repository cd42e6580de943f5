//! Resolved column mappings.

use std::collections::{BTreeMap, HashMap};

use catalog_model::{Attribute, EntityId, SchemaEntry, Variable};
use serde::{Deserialize, Serialize};

/// What an import is mapped against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappingSource {
    /// Explicit schema; columns are matched by variable key.
    Schema(Vec<SchemaEntry>),
    /// The target data set's stored schema.
    DataSetSchema,
    /// Source column name to variable id.
    Columns(BTreeMap<String, EntityId>),
}

/// How columns of a resolved mapping are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappingMode {
    /// By variable key.
    Schema,
    /// By source column name.
    Columns,
}

impl MappingSource {
    pub fn mode(&self) -> MappingMode {
        match self {
            Self::Schema(_) | Self::DataSetSchema => MappingMode::Schema,
            Self::Columns(_) => MappingMode::Columns,
        }
    }
}

/// Resolution of one source column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnMapping {
    /// `None` when the mapped variable id did not resolve.
    pub variable: Option<Variable>,
    /// Known attributes of the variable, by key.
    pub attributes: HashMap<String, Attribute>,
}

impl ColumnMapping {
    pub fn new(variable: Option<Variable>, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            variable,
            attributes: attributes
                .into_iter()
                .map(|attribute| (attribute.key.clone(), attribute))
                .collect(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }
}

/// Lookup table from source column to variable and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    mode: MappingMode,
    columns: HashMap<String, ColumnMapping>,
    /// Schema variable ids that did not resolve.
    unresolved: Vec<EntityId>,
}

impl Mapping {
    pub fn new(mode: MappingMode) -> Self {
        Self {
            mode,
            columns: HashMap::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    pub fn insert(&mut self, column: impl Into<String>, mapping: ColumnMapping) {
        self.columns.insert(column.into(), mapping);
    }

    pub fn column(&self, column: &str) -> Option<&ColumnMapping> {
        self.columns.get(column)
    }

    /// Adds an attribute created during the import so later rows reuse it.
    pub fn remember_attribute(&mut self, column: &str, attribute: Attribute) {
        if let Some(mapping) = self.columns.get_mut(column) {
            mapping.attributes.insert(attribute.key.clone(), attribute);
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn mark_unresolved(&mut self, variable: EntityId) {
        self.unresolved.push(variable);
    }

    pub fn unresolved(&self) -> &[EntityId] {
        &self.unresolved
    }
}
