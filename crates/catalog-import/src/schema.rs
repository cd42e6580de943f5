//! Observed schema of imported individuals.

use std::collections::{HashMap, HashSet};

use catalog_model::{EntityId, Fact, Individual, SchemaEntry};

/// Running tally of the variables and attributes seen during an import.
///
/// Variables keep the order they were first seen in; so do the attributes
/// of each variable.
#[derive(Debug, Default)]
pub struct SchemaTally {
    entries: Vec<SchemaEntry>,
    positions: HashMap<EntityId, usize>,
    attributes: HashSet<(EntityId, EntityId)>,
}

impl SchemaTally {
    pub fn observe(&mut self, individual: &Individual) {
        for fact in &individual.facts {
            let variable = fact.variable();
            let position = *self.positions.entry(variable).or_insert_with(|| {
                self.entries.push(SchemaEntry::new(variable));
                self.entries.len() - 1
            });
            if let Fact::Categorical {
                attribute: Some(attribute),
                ..
            } = fact
                && self.attributes.insert((variable, *attribute))
            {
                self.entries[position]
                    .attributes
                    .get_or_insert_with(Vec::new)
                    .push(*attribute);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_schema(self) -> Vec<SchemaEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u64) -> EntityId {
        EntityId::new(value)
    }

    #[test]
    fn keeps_first_seen_order_without_duplicates() {
        let mut tally = SchemaTally::default();
        tally.observe(&Individual::new(
            1,
            id(56),
            vec![
                Fact::categorical(id(9), Some(id(12))),
                Fact::numerical(id(10), Some(1.0)),
            ],
        ));
        tally.observe(&Individual::new(
            2,
            id(56),
            vec![
                Fact::categorical(id(9), Some(id(12))),
                Fact::text(id(11), None),
                Fact::categorical(id(13), None),
            ],
        ));

        assert_eq!(
            tally.into_schema(),
            vec![
                SchemaEntry::new(9u64).with_attributes([12u64]),
                SchemaEntry::new(10u64),
                SchemaEntry::new(11u64),
                SchemaEntry::new(13u64),
            ]
        );
    }
}
