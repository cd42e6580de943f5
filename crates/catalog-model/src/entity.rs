//! Catalog entity definitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::fact::SchemaEntry;
use crate::ids::EntityId;

/// Kinds of entity stored in a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Folder,
    DataSet,
    Variable,
    Attribute,
    User,
    Publication,
}

impl EntityType {
    /// Every entity type, in dependency order (parents before dependents).
    pub const ALL: [EntityType; 6] = [
        EntityType::Folder,
        EntityType::DataSet,
        EntityType::Variable,
        EntityType::Attribute,
        EntityType::User,
        EntityType::Publication,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::DataSet => "dataSet",
            Self::Variable => "variable",
            Self::Attribute => "attribute",
            Self::User => "user",
            Self::Publication => "publication",
        }
    }

    /// Entity types that carry a `parent` reference to the same type.
    pub fn is_hierarchical(self) -> bool {
        matches!(self, Self::Folder | Self::Attribute)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::InvalidEntityType(s.to_string()))
    }
}

/// Value type of a variable; decides the shape of its facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Categorical,
    Numerical,
    Text,
}

impl VariableType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categorical => "categorical",
            Self::Numerical => "numerical",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "categorical" => Ok(Self::Categorical),
            // Older catalogs call numerical variables "quantitative".
            "numerical" | "quantitative" => Ok(Self::Numerical),
            "text" => Ok(Self::Text),
            _ => Err(ModelError::InvalidVariableType(s.to_string())),
        }
    }
}

/// Display formatter kinds for numerical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Number,
    Percent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Decimal places to round to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    /// Group thousands with separators.
    #[serde(default)]
    pub pretty: bool,
}

/// Display format attached to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueFormat {
    #[serde(rename = "type")]
    pub kind: FormatKind,
    #[serde(default)]
    pub options: FormatOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            name: name.into(),
            parent: None,
            created: None,
            modified: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A data set: owner of imported facts and of the schema derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<SchemaEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl DataSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            name: name.into(),
            folder: None,
            schema: None,
            data_modified: None,
            created: None,
            modified: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_folder(mut self, folder: impl Into<EntityId>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_schema(mut self, schema: Vec<SchemaEntry>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn set_data_modified(&mut self, timestamp: DateTime<Utc>) {
        self.data_modified = Some(timestamp);
    }
}

/// A typed column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "VariableRecord")]
pub struct Variable {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: VariableType,
    /// Data set this variable is local to; `None` for global variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoped_data_set: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ValueFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Variable {
    /// New variable whose key defaults to its trimmed name.
    pub fn new(name: impl Into<String>, kind: VariableType) -> Self {
        let name = name.into();
        Self {
            id: EntityId::UNASSIGNED,
            key: name.trim().to_string(),
            name,
            kind,
            scoped_data_set: None,
            format: None,
            created: None,
            modified: None,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Categorical)
    }

    pub fn numerical(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Numerical)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Text)
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn scoped_to(mut self, data_set: impl Into<EntityId>) -> Self {
        self.scoped_data_set = Some(data_set.into());
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// True when the variable may be used in the given data set.
    pub fn is_visible_in(&self, data_set: EntityId) -> bool {
        self.scoped_data_set.is_none_or(|scope| scope == data_set)
    }
}

/// A categorical value belonging to exactly one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AttributeRecord")]
pub struct Attribute {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub key: String,
    pub variable: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Attribute {
    /// New attribute whose key defaults to its trimmed name.
    pub fn new(name: impl Into<String>, variable: impl Into<EntityId>) -> Self {
        let name = name.into();
        Self {
            id: EntityId::UNASSIGNED,
            key: name.trim().to_string(),
            name,
            variable: variable.into(),
            parent: None,
            created: None,
            modified: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Stored key, or the trimmed name when the key is missing or blank.
fn key_or_name(key: Option<String>, name: &str) -> String {
    match key {
        Some(key) if !key.trim().is_empty() => key,
        _ => name.trim().to_string(),
    }
}

/// Wire form of [`Variable`] with an optional key.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariableRecord {
    #[serde(default)]
    id: EntityId,
    name: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(rename = "type")]
    kind: VariableType,
    #[serde(default)]
    scoped_data_set: Option<EntityId>,
    #[serde(default)]
    format: Option<ValueFormat>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
}

impl From<VariableRecord> for Variable {
    fn from(record: VariableRecord) -> Self {
        Self {
            id: record.id,
            key: key_or_name(record.key, &record.name),
            name: record.name,
            kind: record.kind,
            scoped_data_set: record.scoped_data_set,
            format: record.format,
            created: record.created,
            modified: record.modified,
        }
    }
}

/// Wire form of [`Attribute`] with an optional key.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeRecord {
    #[serde(default)]
    id: EntityId,
    name: String,
    #[serde(default)]
    key: Option<String>,
    variable: EntityId,
    #[serde(default)]
    parent: Option<EntityId>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
}

impl From<AttributeRecord> for Attribute {
    fn from(record: AttributeRecord) -> Self {
        Self {
            id: record.id,
            key: key_or_name(record.key, &record.name),
            name: record.name,
            variable: record.variable,
            parent: record.parent,
            created: record.created,
            modified: record.modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            name: name.into(),
            email: None,
            created: None,
            modified: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }
}

/// Record of one full publish to a target catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    #[serde(default)]
    pub id: EntityId,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Publication {
    pub fn new(target: impl Into<String>, user: Option<EntityId>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            target: target.into(),
            user,
            created: None,
            modified: None,
        }
    }
}

/// Any catalog entity, tagged with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "camelCase")]
pub enum Entity {
    Folder(Folder),
    DataSet(DataSet),
    Variable(Variable),
    Attribute(Attribute),
    User(User),
    Publication(Publication),
}

macro_rules! entity_conversions {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Entity {
                fn from(value: $variant) -> Self {
                    Entity::$variant(value)
                }
            }

            impl TryFrom<Entity> for $variant {
                type Error = ModelError;

                fn try_from(entity: Entity) -> Result<Self, Self::Error> {
                    match entity {
                        Entity::$variant(value) => Ok(value),
                        other => Err(ModelError::UnexpectedEntityType {
                            expected: EntityType::$variant,
                            found: other.entity_type(),
                        }),
                    }
                }
            }
        )*
    };
}

entity_conversions!(Folder, DataSet, Variable, Attribute, User, Publication);

macro_rules! each_entity {
    ($entity:expr, $inner:ident => $body:expr) => {
        match $entity {
            Entity::Folder($inner) => $body,
            Entity::DataSet($inner) => $body,
            Entity::Variable($inner) => $body,
            Entity::Attribute($inner) => $body,
            Entity::User($inner) => $body,
            Entity::Publication($inner) => $body,
        }
    };
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Folder(_) => EntityType::Folder,
            Self::DataSet(_) => EntityType::DataSet,
            Self::Variable(_) => EntityType::Variable,
            Self::Attribute(_) => EntityType::Attribute,
            Self::User(_) => EntityType::User,
            Self::Publication(_) => EntityType::Publication,
        }
    }

    pub fn id(&self) -> EntityId {
        each_entity!(self, e => e.id)
    }

    pub fn set_id(&mut self, id: EntityId) {
        each_entity!(self, e => e.id = id);
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        each_entity!(self, e => e.created)
    }

    pub fn set_created(&mut self, timestamp: DateTime<Utc>) {
        each_entity!(self, e => e.created = Some(timestamp));
    }

    pub fn set_modified(&mut self, timestamp: DateTime<Utc>) {
        each_entity!(self, e => e.modified = Some(timestamp));
    }

    /// Parent of a hierarchical entity (folders and attributes).
    pub fn parent(&self) -> Option<EntityId> {
        match self {
            Self::Folder(folder) => folder.parent,
            Self::Attribute(attribute) => attribute.parent,
            _ => None,
        }
    }

    /// Field view used to evaluate [`crate::Filter`] expressions.
    pub fn fields(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
