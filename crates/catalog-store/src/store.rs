//! Storage traits.
//!
//! A [`CatalogStore`] hands out [`StoreTransaction`]s bound to one catalog.
//! Every read and write of an import, delete or publish happens inside a
//! transaction; nothing is visible to other transactions until
//! [`StoreTransaction::commit`].

use catalog_model::{DataFilter, Entity, EntityId, EntityType, Filter, Individual, QueryOptions};

use crate::error::Result;

/// Storage engine holding one or more named catalogs.
pub trait CatalogStore: Send + Sync {
    /// Opens a transaction on the named catalog.
    ///
    /// Implementations may block until other transactions finish.
    fn begin(&self, catalog: &str) -> Result<Box<dyn StoreTransaction + '_>>;

    /// Names of the catalogs in the store.
    fn catalogs(&self) -> Result<Vec<String>>;
}

/// An open transaction on one catalog.
///
/// Dropping a transaction without committing discards its changes.
pub trait StoreTransaction {
    /// Name of the catalog this transaction is bound to.
    fn catalog(&self) -> &str;

    fn query_entities(
        &mut self,
        entity_type: EntityType,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Entity>>;

    /// Inserts entities, assigning ids to those without one.
    ///
    /// Entities that already carry an id keep it; an id already in use is an
    /// error.
    fn create_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>>;

    /// Replaces stored entities by id.
    fn update_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>>;

    /// Removes entities of one type; returns how many existed.
    fn delete_entities(&mut self, entity_type: EntityType, ids: &[EntityId]) -> Result<usize>;

    /// Appends individuals to their data sets.
    fn create_facts(&mut self, individuals: Vec<Individual>) -> Result<()>;

    /// Reads individuals selected by a data filter.
    fn query_facts(&mut self, filter: &DataFilter) -> Result<Vec<Individual>>;

    /// Removes data selected by a data filter; returns the number of
    /// individuals removed or changed.
    fn delete_facts(&mut self, filter: &DataFilter) -> Result<usize>;

    /// Replaces every entity of the given types in `target` with this
    /// catalog's entities.
    fn publish_entities(&mut self, target: &str, entity_types: &[EntityType]) -> Result<usize>;

    /// Replaces the facts of the given data sets in `target` with this
    /// catalog's facts.
    fn publish_facts(&mut self, target: &str, data_sets: &[EntityId]) -> Result<usize>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}
