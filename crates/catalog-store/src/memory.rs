//! In-memory catalog store.
//!
//! [`MemoryStore`] keeps every catalog in process memory behind one mutex. A
//! transaction holds the lock from [`CatalogStore::begin`] until it is
//! committed, rolled back or dropped, and works on copies of the catalogs it
//! touches; commit swaps the copies in.
//!
//! State survives the process only through the catalog file
//! (see [`crate::save_catalog_file`]).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use catalog_model::{
    DataFilter, Entity, EntityId, EntityType, Filter, Individual, QueryOptions,
};
use serde::{Deserialize, Serialize};

use crate::data::{remove_facts, select_individuals};
use crate::error::{Result, StoreError};
use crate::store::{CatalogStore, StoreTransaction};

/// Contents of one catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogData {
    last_id: u64,
    entities: BTreeMap<EntityType, BTreeMap<EntityId, Entity>>,
    data: BTreeMap<EntityId, Vec<Individual>>,
}

/// Serialized form of a catalog, as stored in catalog files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub name: String,
    #[serde(default)]
    pub last_id: u64,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub individuals: Vec<Individual>,
}

impl CatalogData {
    pub fn entity_count(&self, entity_type: EntityType) -> usize {
        self.entities.get(&entity_type).map_or(0, BTreeMap::len)
    }

    pub fn individual_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    fn contains_id(&self, id: EntityId) -> bool {
        self.entities.values().any(|by_id| by_id.contains_key(&id))
    }

    fn insert(&mut self, mut entity: Entity) -> Result<Entity> {
        let id = entity.id();
        if id.is_assigned() {
            if self.contains_id(id) {
                return Err(StoreError::DuplicateId(id));
            }
            self.last_id = self.last_id.max(id.get());
        } else {
            self.last_id += 1;
            entity.set_id(EntityId::new(self.last_id));
        }
        self.entities
            .entry(entity.entity_type())
            .or_default()
            .insert(entity.id(), entity.clone());
        Ok(entity)
    }

    fn to_snapshot(&self, name: &str) -> CatalogSnapshot {
        CatalogSnapshot {
            name: name.to_string(),
            last_id: self.last_id,
            entities: self
                .entities
                .values()
                .flat_map(BTreeMap::values)
                .cloned()
                .collect(),
            individuals: self.data.values().flatten().cloned().collect(),
        }
    }

    fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self> {
        let mut catalog = Self {
            last_id: snapshot.last_id,
            ..Self::default()
        };
        for entity in snapshot.entities {
            if !entity.id().is_assigned() {
                return Err(StoreError::InvalidEntity(format!(
                    "stored {} without an id",
                    entity.entity_type()
                )));
            }
            catalog.insert(entity)?;
        }
        for individual in snapshot.individuals {
            catalog
                .data
                .entry(individual.data_set)
                .or_default()
                .push(individual);
        }
        Ok(catalog)
    }
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned
}

/// Thread-safe in-memory store of named catalogs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalogs: Mutex<BTreeMap<String, CatalogData>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with empty catalogs of the given names.
    #[must_use]
    pub fn with_catalogs<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalogs = names
            .into_iter()
            .map(|name| (name.into(), CatalogData::default()))
            .collect();
        Self {
            catalogs: Mutex::new(catalogs),
        }
    }

    /// Adds an empty catalog; returns false if it already existed.
    pub fn create_catalog(&self, name: &str) -> Result<bool> {
        let mut catalogs = self.catalogs.lock().map_err(poison_err)?;
        if catalogs.contains_key(name) {
            return Ok(false);
        }
        catalogs.insert(name.to_string(), CatalogData::default());
        Ok(true)
    }

    /// Copy of the committed state of one catalog.
    pub fn catalog_data(&self, name: &str) -> Result<CatalogData> {
        let catalogs = self.catalogs.lock().map_err(poison_err)?;
        catalogs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownCatalog(name.to_string()))
    }

    pub fn snapshot(&self) -> Result<Vec<CatalogSnapshot>> {
        let catalogs = self.catalogs.lock().map_err(poison_err)?;
        Ok(catalogs
            .iter()
            .map(|(name, data)| data.to_snapshot(name))
            .collect())
    }

    pub fn from_snapshots(snapshots: Vec<CatalogSnapshot>) -> Result<Self> {
        let mut catalogs = BTreeMap::new();
        for snapshot in snapshots {
            let name = snapshot.name.clone();
            catalogs.insert(name, CatalogData::from_snapshot(snapshot)?);
        }
        Ok(Self {
            catalogs: Mutex::new(catalogs),
        })
    }
}

impl CatalogStore for MemoryStore {
    fn begin(&self, catalog: &str) -> Result<Box<dyn StoreTransaction + '_>> {
        let guard = self.catalogs.lock().map_err(poison_err)?;
        if !guard.contains_key(catalog) {
            return Err(StoreError::UnknownCatalog(catalog.to_string()));
        }
        tracing::debug!(catalog, "Transaction started");
        Ok(Box::new(MemoryTransaction {
            guard,
            catalog: catalog.to_string(),
            working: BTreeMap::new(),
        }))
    }

    fn catalogs(&self) -> Result<Vec<String>> {
        let catalogs = self.catalogs.lock().map_err(poison_err)?;
        Ok(catalogs.keys().cloned().collect())
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, BTreeMap<String, CatalogData>>,
    catalog: String,
    /// Copies of the catalogs touched so far.
    working: BTreeMap<String, CatalogData>,
}

impl MemoryTransaction<'_> {
    fn catalog_mut(&mut self, name: &str) -> &mut CatalogData {
        let committed = &self.guard;
        self.working
            .entry(name.to_string())
            .or_insert_with(|| committed.get(name).cloned().unwrap_or_default())
    }

    fn current(&mut self) -> &mut CatalogData {
        let name = self.catalog.clone();
        self.catalog_mut(&name)
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn catalog(&self) -> &str {
        &self.catalog
    }

    fn query_entities(
        &mut self,
        entity_type: EntityType,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Entity>> {
        let matched = self
            .current()
            .entities
            .get(&entity_type)
            .map(|by_id| {
                by_id
                    .values()
                    .filter(|entity| filter.matches_entity(entity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(options.apply(matched))
    }

    fn create_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        let catalog = self.current();
        entities
            .into_iter()
            .map(|entity| catalog.insert(entity))
            .collect()
    }

    fn update_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        let catalog = self.current();
        for entity in &entities {
            let slot = catalog
                .entities
                .get_mut(&entity.entity_type())
                .and_then(|by_id| by_id.get_mut(&entity.id()))
                .ok_or(StoreError::NotFound {
                    entity_type: entity.entity_type(),
                    id: entity.id(),
                })?;
            *slot = entity.clone();
        }
        Ok(entities)
    }

    fn delete_entities(&mut self, entity_type: EntityType, ids: &[EntityId]) -> Result<usize> {
        let catalog = self.current();
        let Some(by_id) = catalog.entities.get_mut(&entity_type) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| by_id.remove(*id).is_some()).count())
    }

    fn create_facts(&mut self, individuals: Vec<Individual>) -> Result<()> {
        let catalog = self.current();
        for individual in individuals {
            let data_set = individual.data_set;
            let known = catalog
                .entities
                .get(&EntityType::DataSet)
                .is_some_and(|by_id| by_id.contains_key(&data_set));
            if !known {
                return Err(StoreError::NotFound {
                    entity_type: EntityType::DataSet,
                    id: data_set,
                });
            }
            catalog.data.entry(data_set).or_default().push(individual);
        }
        Ok(())
    }

    fn query_facts(&mut self, filter: &DataFilter) -> Result<Vec<Individual>> {
        let catalog = self.current();
        let data_sets: Vec<EntityId> = if filter.data_sets.is_empty() {
            catalog.data.keys().copied().collect()
        } else {
            filter.data_sets.clone()
        };
        Ok(data_sets
            .iter()
            .filter_map(|data_set| catalog.data.get(data_set))
            .flat_map(|individuals| select_individuals(individuals, filter))
            .collect())
    }

    fn delete_facts(&mut self, filter: &DataFilter) -> Result<usize> {
        let catalog = self.current();
        let mut removed = 0;
        for (data_set, individuals) in catalog.data.iter_mut() {
            if filter.data_sets.is_empty() || filter.data_sets.contains(data_set) {
                removed += remove_facts(individuals, filter);
            }
        }
        catalog.data.retain(|_, individuals| !individuals.is_empty());
        Ok(removed)
    }

    fn publish_entities(&mut self, target: &str, entity_types: &[EntityType]) -> Result<usize> {
        let source = self.current();
        let last_id = source.last_id;
        let copied: Vec<(EntityType, BTreeMap<EntityId, Entity>)> = entity_types
            .iter()
            .map(|entity_type| {
                let by_id = source.entities.get(entity_type).cloned().unwrap_or_default();
                (*entity_type, by_id)
            })
            .collect();

        let count = copied.iter().map(|(_, by_id)| by_id.len()).sum();
        let destination = self.catalog_mut(target);
        for (entity_type, by_id) in copied {
            destination.entities.insert(entity_type, by_id);
        }
        destination.last_id = destination.last_id.max(last_id);
        Ok(count)
    }

    fn publish_facts(&mut self, target: &str, data_sets: &[EntityId]) -> Result<usize> {
        let source = self.current();
        let copied: Vec<(EntityId, Vec<Individual>)> = data_sets
            .iter()
            .map(|data_set| {
                let individuals = source.data.get(data_set).cloned().unwrap_or_default();
                (*data_set, individuals)
            })
            .collect();

        let count = copied.iter().map(|(_, individuals)| individuals.len()).sum();
        let destination = self.catalog_mut(target);
        for (data_set, individuals) in copied {
            if individuals.is_empty() {
                destination.data.remove(&data_set);
            } else {
                destination.data.insert(data_set, individuals);
            }
        }
        Ok(count)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard,
            catalog,
            working,
        } = *self;
        let touched = working.len();
        guard.extend(working);
        tracing::debug!(catalog = %catalog, touched, "Transaction committed");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        tracing::debug!(catalog = %self.catalog, "Transaction rolled back");
        Ok(())
    }
}
