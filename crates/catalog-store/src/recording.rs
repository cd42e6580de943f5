//! Recording store for tests.
//!
//! [`RecordingStore`] wraps a [`MemoryStore`], logs the transaction calls it
//! sees and can inject failures into chosen operations.

use std::sync::Mutex;

use catalog_model::{DataFilter, Entity, EntityId, EntityType, Filter, Individual, QueryOptions};

use crate::error::{Result, StoreError};
use crate::memory::MemoryStore;
use crate::store::{CatalogStore, StoreTransaction};

/// A transaction call observed by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Begin,
    CreateFacts { individuals: usize },
    DeleteFacts,
    UpdateEntities { count: usize },
    Commit,
    Rollback,
}

#[derive(Debug, Default, Clone)]
struct FailurePlan {
    /// 1-based `create_facts` call that fails.
    create_facts_call: Option<usize>,
    entity_query: Option<EntityType>,
    updates: bool,
}

/// Store double that records calls and injects failures.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    events: Mutex<Vec<StoreEvent>>,
    plan: FailurePlan,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            events: Mutex::new(Vec::new()),
            plan: FailurePlan::default(),
        }
    }

    /// Fails the `call`-th `create_facts` of each transaction (1-based).
    #[must_use]
    pub fn fail_create_facts_on(mut self, call: usize) -> Self {
        self.plan.create_facts_call = Some(call);
        self
    }

    /// Fails every entity query for `entity_type`.
    #[must_use]
    pub fn fail_entity_queries(mut self, entity_type: EntityType) -> Self {
        self.plan.entity_query = Some(entity_type);
        self
    }

    /// Fails every entity update.
    #[must_use]
    pub fn fail_updates(mut self) -> Self {
        self.plan.updates = true;
        self
    }

    /// The wrapped store, for inspecting committed state.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, event: &StoreEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn record(&self, event: StoreEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl CatalogStore for RecordingStore {
    fn begin(&self, catalog: &str) -> Result<Box<dyn StoreTransaction + '_>> {
        let inner = self.inner.begin(catalog)?;
        self.record(StoreEvent::Begin);
        Ok(Box::new(RecordingTransaction {
            inner,
            store: self,
            create_facts_calls: 0,
        }))
    }

    fn catalogs(&self) -> Result<Vec<String>> {
        self.inner.catalogs()
    }
}

struct RecordingTransaction<'a> {
    inner: Box<dyn StoreTransaction + 'a>,
    store: &'a RecordingStore,
    create_facts_calls: usize,
}

fn injected(operation: &str) -> StoreError {
    StoreError::Backend(format!("injected {operation} failure"))
}

impl StoreTransaction for RecordingTransaction<'_> {
    fn catalog(&self) -> &str {
        self.inner.catalog()
    }

    fn query_entities(
        &mut self,
        entity_type: EntityType,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Entity>> {
        if self.store.plan.entity_query == Some(entity_type) {
            return Err(injected("query"));
        }
        self.inner.query_entities(entity_type, filter, options)
    }

    fn create_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.inner.create_entities(entities)
    }

    fn update_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.store.record(StoreEvent::UpdateEntities {
            count: entities.len(),
        });
        if self.store.plan.updates {
            return Err(injected("update"));
        }
        self.inner.update_entities(entities)
    }

    fn delete_entities(&mut self, entity_type: EntityType, ids: &[EntityId]) -> Result<usize> {
        self.inner.delete_entities(entity_type, ids)
    }

    fn create_facts(&mut self, individuals: Vec<Individual>) -> Result<()> {
        self.create_facts_calls += 1;
        self.store.record(StoreEvent::CreateFacts {
            individuals: individuals.len(),
        });
        if self.store.plan.create_facts_call == Some(self.create_facts_calls) {
            return Err(injected("create_facts"));
        }
        self.inner.create_facts(individuals)
    }

    fn query_facts(&mut self, filter: &DataFilter) -> Result<Vec<Individual>> {
        self.inner.query_facts(filter)
    }

    fn delete_facts(&mut self, filter: &DataFilter) -> Result<usize> {
        self.store.record(StoreEvent::DeleteFacts);
        self.inner.delete_facts(filter)
    }

    fn publish_entities(&mut self, target: &str, entity_types: &[EntityType]) -> Result<usize> {
        self.inner.publish_entities(target, entity_types)
    }

    fn publish_facts(&mut self, target: &str, data_sets: &[EntityId]) -> Result<usize> {
        self.inner.publish_facts(target, data_sets)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.store.record(StoreEvent::Commit);
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.store.record(StoreEvent::Rollback);
        self.inner.rollback()
    }
}
