use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a catalog entity.
///
/// Ids are assigned by storage on create. `EntityId::UNASSIGNED` (zero) marks
/// an entity that has not been persisted yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(u64);

pub type DataSetId = EntityId;
pub type VariableId = EntityId;
pub type AttributeId = EntityId;

impl EntityId {
    pub const UNASSIGNED: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// True when the id refers to a stored entity.
    pub const fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<EntityId> for serde_json::Value {
    fn from(id: EntityId) -> Self {
        serde_json::Value::from(id.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_id_is_not_assigned() {
        assert!(!EntityId::UNASSIGNED.is_assigned());
        assert!(EntityId::new(1).is_assigned());
    }

    #[test]
    fn id_serializes_as_plain_number() {
        let json = serde_json::to_string(&EntityId::new(56)).unwrap();
        assert_eq!(json, "56");
    }
}
