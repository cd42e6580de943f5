//! Facts, individuals and data-set schema entries.

use serde::{Deserialize, Serialize};

use crate::entity::VariableType;
use crate::ids::EntityId;

/// One variable/value pair of an individual.
///
/// The variant is fixed by the owning variable's [`VariableType`]; a fact never
/// carries a value of another shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Fact {
    Categorical {
        variable: EntityId,
        attribute: Option<EntityId>,
    },
    Numerical {
        variable: EntityId,
        value: Option<f64>,
    },
    Text {
        variable: EntityId,
        value: Option<String>,
    },
}

impl Fact {
    pub fn categorical(variable: EntityId, attribute: Option<EntityId>) -> Self {
        Self::Categorical {
            variable,
            attribute,
        }
    }

    pub fn numerical(variable: EntityId, value: Option<f64>) -> Self {
        Self::Numerical { variable, value }
    }

    pub fn text(variable: EntityId, value: Option<String>) -> Self {
        Self::Text { variable, value }
    }

    pub fn variable(&self) -> EntityId {
        match self {
            Self::Categorical { variable, .. }
            | Self::Numerical { variable, .. }
            | Self::Text { variable, .. } => *variable,
        }
    }

    /// Referenced attribute of a categorical fact.
    pub fn attribute(&self) -> Option<EntityId> {
        match self {
            Self::Categorical { attribute, .. } => *attribute,
            _ => None,
        }
    }

    pub fn kind(&self) -> VariableType {
        match self {
            Self::Categorical { .. } => VariableType::Categorical,
            Self::Numerical { .. } => VariableType::Numerical,
            Self::Text { .. } => VariableType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Categorical { attribute, .. } => attribute.is_none(),
            Self::Numerical { value, .. } => value.is_none(),
            Self::Text { value, .. } => value.is_none(),
        }
    }
}

/// One imported row worth of facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Individual {
    /// 1-based ordinal of the source row.
    pub id: u64,
    pub data_set: EntityId,
    pub facts: Vec<Fact>,
}

impl Individual {
    pub fn new(id: u64, data_set: EntityId, facts: Vec<Fact>) -> Self {
        Self {
            id,
            data_set,
            facts,
        }
    }

    pub fn has_attribute(&self, attribute: EntityId) -> bool {
        self.facts
            .iter()
            .any(|fact| fact.attribute() == Some(attribute))
    }
}

/// A variable present in a data set, with the attributes observed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub variable: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<EntityId>>,
}

impl SchemaEntry {
    pub fn new(variable: impl Into<EntityId>) -> Self {
        Self {
            variable: variable.into(),
            attributes: None,
        }
    }

    pub fn with_attributes<I, T>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Listed attribute ids; empty for non-categorical entries.
    pub fn attribute_ids(&self) -> &[EntityId] {
        self.attributes.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn facts_serialize_with_type_tag() {
        let fact = Fact::categorical(EntityId::new(72), Some(EntityId::new(45)));
        assert_eq!(
            serde_json::to_value(&fact).unwrap(),
            json!({"type": "categorical", "variable": 72, "attribute": 45})
        );

        let fact = Fact::numerical(EntityId::new(600), None);
        assert_eq!(
            serde_json::to_value(&fact).unwrap(),
            json!({"type": "numerical", "variable": 600, "value": null})
        );
    }

    #[test]
    fn individual_finds_attributes() {
        let individual = Individual::new(
            1,
            EntityId::new(56),
            vec![
                Fact::categorical(EntityId::new(72), Some(EntityId::new(45))),
                Fact::numerical(EntityId::new(600), Some(0.5)),
            ],
        );

        assert!(individual.has_attribute(EntityId::new(45)));
        assert!(!individual.has_attribute(EntityId::new(76)));
        assert_eq!(individual.facts[1].kind(), VariableType::Numerical);
    }

    #[test]
    fn schema_entry_omits_missing_attributes() {
        let entry = SchemaEntry::new(10u64);
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!({"variable": 10}));
        assert!(entry.attribute_ids().is_empty());

        let entry = SchemaEntry::new(9u64).with_attributes([12u64]);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"variable": 9, "attributes": [12]})
        );
    }
}
