//! Entity repository over a store transaction.

use catalog_model::{
    Attribute, Clock, DataFilter, DataSet, Entity, EntityId, EntityType, Filter, QueryOptions,
    Variable,
};

use crate::error::{Result, StoreError};
use crate::store::StoreTransaction;

/// Creates attributes discovered while importing.
///
/// The generator only needs this one write, so it takes the capability rather
/// than a whole repository.
pub trait AttributeCreator {
    /// Persists a new attribute and returns it with its assigned id.
    fn create_attribute(&mut self, attribute: Attribute) -> Result<Attribute>;
}

/// Typed entity access within one transaction.
///
/// `create` and `update` stamp `created` / `modified` from the clock;
/// `delete` removes dependents as well.
pub struct EntityRepository<'t, T: StoreTransaction + ?Sized> {
    tx: &'t mut T,
    clock: &'t dyn Clock,
}

impl<'t, T: StoreTransaction + ?Sized> EntityRepository<'t, T> {
    pub fn new(tx: &'t mut T, clock: &'t dyn Clock) -> Self {
        Self { tx, clock }
    }

    /// The underlying transaction, for fact writes.
    pub fn transaction(&mut self) -> &mut T {
        self.tx
    }

    pub fn query(
        &mut self,
        entity_type: EntityType,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Entity>> {
        self.tx.query_entities(entity_type, filter, options)
    }

    pub fn query_all(&mut self, entity_type: EntityType) -> Result<Vec<Entity>> {
        self.query(entity_type, &Filter::All, &QueryOptions::default())
    }

    pub fn query_by_ids(&mut self, entity_type: EntityType, ids: &[EntityId]) -> Result<Vec<Entity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query(
            entity_type,
            &Filter::by_ids(ids.iter().copied()),
            &QueryOptions::default(),
        )
    }

    pub fn query_by_id(&mut self, entity_type: EntityType, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.query_by_ids(entity_type, &[id])?.into_iter().next())
    }

    /// Loads a data set, failing when it does not exist.
    pub fn data_set(&mut self, id: EntityId) -> Result<DataSet> {
        let entity = self
            .query_by_id(EntityType::DataSet, id)?
            .ok_or(StoreError::NotFound {
                entity_type: EntityType::DataSet,
                id,
            })?;
        Ok(DataSet::try_from(entity)?)
    }

    pub fn variables(&mut self, filter: &Filter) -> Result<Vec<Variable>> {
        self.query(EntityType::Variable, filter, &QueryOptions::default())?
            .into_iter()
            .map(|entity| Variable::try_from(entity).map_err(StoreError::from))
            .collect()
    }

    pub fn attributes(&mut self, filter: &Filter) -> Result<Vec<Attribute>> {
        self.query(EntityType::Attribute, filter, &QueryOptions::default())?
            .into_iter()
            .map(|entity| Attribute::try_from(entity).map_err(StoreError::from))
            .collect()
    }

    /// Inserts new entities; none may carry an id.
    pub fn create(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        if entities.iter().any(|entity| entity.id().is_assigned()) {
            return Err(StoreError::InvalidEntity(
                "entities must have empty ids when inserting new records".to_string(),
            ));
        }
        let now = self.clock.now();
        let stamped = entities
            .into_iter()
            .map(|mut entity| {
                entity.set_created(now);
                entity.set_modified(now);
                entity
            })
            .collect();
        let created = self.tx.create_entities(stamped)?;
        tracing::debug!(catalog = self.tx.catalog(), count = created.len(), "Created entities");
        Ok(created)
    }

    /// Replaces stored entities; all must carry an id.
    pub fn update(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        if entities.iter().any(|entity| !entity.id().is_assigned()) {
            return Err(StoreError::InvalidEntity(
                "entities must not have empty ids when updating records".to_string(),
            ));
        }
        let now = self.clock.now();
        let stamped = entities
            .into_iter()
            .map(|mut entity| {
                entity.set_modified(now);
                entity
            })
            .collect();
        self.tx.update_entities(stamped)
    }

    /// Deletes entities together with everything that depends on them.
    ///
    /// - folder: child folders and the data sets in them
    /// - data set: variables scoped to it and its data
    /// - variable: its attributes and its facts
    /// - attribute: child attributes and facts referencing it
    ///
    /// Returns the number of entities removed, dependents included.
    pub fn delete(&mut self, entity_type: EntityType, ids: &[EntityId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut removed = self.tx.delete_entities(entity_type, ids)?;
        removed += self.delete_dependents(entity_type, ids)?;
        tracing::info!(
            catalog = self.tx.catalog(),
            entity_type = %entity_type,
            ids = ids.len(),
            removed,
            "Deleted entities"
        );
        Ok(removed)
    }

    fn delete_dependents(&mut self, entity_type: EntityType, ids: &[EntityId]) -> Result<usize> {
        let id_values = || ids.iter().copied();
        let mut removed = 0;
        match entity_type {
            EntityType::Folder => {
                removed += self.find_and_delete(EntityType::Folder, &Filter::any_of("parent", id_values()))?;
                removed += self.find_and_delete(EntityType::DataSet, &Filter::any_of("folder", id_values()))?;
            }
            EntityType::DataSet => {
                removed += self.find_and_delete(
                    EntityType::Variable,
                    &Filter::any_of("scopedDataSet", id_values()),
                )?;
                self.tx
                    .delete_facts(&DataFilter::default().with_data_sets(id_values()))?;
            }
            EntityType::Variable => {
                removed += self.find_and_delete(EntityType::Attribute, &Filter::any_of("variable", id_values()))?;
                self.tx
                    .delete_facts(&DataFilter::default().with_variables(id_values()))?;
            }
            EntityType::Attribute => {
                removed += self.find_and_delete(EntityType::Attribute, &Filter::any_of("parent", id_values()))?;
                self.tx
                    .delete_facts(&DataFilter::default().with_attributes(id_values()))?;
            }
            EntityType::User | EntityType::Publication => {}
        }
        Ok(removed)
    }

    fn find_and_delete(&mut self, entity_type: EntityType, filter: &Filter) -> Result<usize> {
        let found: Vec<EntityId> = self
            .query(entity_type, filter, &QueryOptions::default())?
            .iter()
            .map(Entity::id)
            .collect();
        self.delete(entity_type, &found)
    }

    /// Parent of a folder or attribute.
    pub fn get_parent(&mut self, entity: &Entity) -> Result<Option<Entity>> {
        require_hierarchical(entity)?;
        match entity.parent() {
            Some(parent) if parent.is_assigned() => self.query_by_id(entity.entity_type(), parent),
            _ => Ok(None),
        }
    }

    /// Direct children of a folder or attribute.
    pub fn get_children(&mut self, entity: &Entity) -> Result<Vec<Entity>> {
        require_hierarchical(entity)?;
        self.query(
            entity.entity_type(),
            &Filter::eq("parent", entity.id()),
            &QueryOptions::default(),
        )
    }
}

fn require_hierarchical(entity: &Entity) -> Result<()> {
    if entity.entity_type().is_hierarchical() {
        Ok(())
    } else {
        Err(StoreError::InvalidEntity(format!(
            "{} is not a hierarchical item",
            entity.entity_type()
        )))
    }
}

impl<T: StoreTransaction + ?Sized> AttributeCreator for EntityRepository<'_, T> {
    fn create_attribute(&mut self, attribute: Attribute) -> Result<Attribute> {
        let created = self.create(vec![attribute.into()])?;
        let entity = created
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("store returned no created attribute".to_string()))?;
        Ok(Attribute::try_from(entity)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::CatalogStore;
    use catalog_model::{Fact, FixedClock, Folder, Individual};
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn create_stamps_timestamps() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let created = repo.create(vec![DataSet::new("Survey").into()]).unwrap();
        assert!(created[0].id().is_assigned());
        assert_eq!(created[0].created(), Some(clock.now()));
    }

    #[test]
    fn create_rejects_entities_with_ids() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let err = repo
            .create(vec![DataSet::new("Survey").with_id(3).into()])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEntity(_)));
    }

    #[test]
    fn update_rejects_entities_without_ids() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let err = repo.update(vec![DataSet::new("Survey").into()]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidEntity(_)));
    }

    #[test]
    fn deleting_a_variable_removes_attributes_and_facts() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        tx.create_entities(vec![
            DataSet::new("Survey").with_id(56).into(),
            Variable::categorical("Location").with_id(72).into(),
            Variable::numerical("Percent").with_id(600).into(),
            Attribute::new("MA", 72).with_id(45).into(),
            Attribute::new("NY", 72).with_id(76).into(),
        ])
        .unwrap();
        tx.create_facts(vec![Individual::new(
            1,
            EntityId::new(56),
            vec![
                Fact::categorical(EntityId::new(72), Some(EntityId::new(45))),
                Fact::numerical(EntityId::new(600), Some(1.0)),
            ],
        )])
        .unwrap();

        let mut repo = EntityRepository::new(&mut *tx, &clock);
        let removed = repo.delete(EntityType::Variable, &[EntityId::new(72)]).unwrap();
        assert_eq!(removed, 3);
        assert!(repo.query_all(EntityType::Attribute).unwrap().is_empty());

        let remaining = tx.query_facts(&DataFilter::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].facts, vec![Fact::numerical(EntityId::new(600), Some(1.0))]);
    }

    #[test]
    fn deleting_a_folder_cascades_to_data_sets_and_scoped_variables() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        tx.create_entities(vec![
            Folder::new("Root").with_id(1).into(),
            Folder::new("Child").with_id(2).with_parent(1).into(),
            DataSet::new("Survey").with_id(3).with_folder(2).into(),
            Variable::text("Notes").with_id(4).scoped_to(3).into(),
            Variable::text("Global").with_id(5).into(),
        ])
        .unwrap();

        let mut repo = EntityRepository::new(&mut *tx, &clock);
        let removed = repo.delete(EntityType::Folder, &[EntityId::new(1)]).unwrap();
        assert_eq!(removed, 4);

        let variables = repo.query_all(EntityType::Variable).unwrap();
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].id(), EntityId::new(5));
    }

    #[test]
    fn parent_and_children_of_attributes() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        let created = tx
            .create_entities(vec![
                Attribute::new("North", 72).with_id(10).into(),
                Attribute::new("MA", 72).with_id(45).with_parent(10).into(),
            ])
            .unwrap();

        let mut repo = EntityRepository::new(&mut *tx, &clock);
        let parent = repo.get_parent(&created[1]).unwrap();
        assert_eq!(parent.map(|p| p.id()), Some(EntityId::new(10)));

        let children = repo.get_children(&created[0]).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id(), EntityId::new(45));

        let data_set: Entity = DataSet::new("Survey").into();
        assert!(repo.get_parent(&data_set).is_err());
    }

    #[test]
    fn attribute_creator_assigns_id() {
        let store = MemoryStore::with_catalogs(["main"]);
        let clock = clock();
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let created = repo.create_attribute(Attribute::new("UNKNOWN1", 72)).unwrap();
        assert!(created.id.is_assigned());
        assert_eq!(created.key, "UNKNOWN1");
    }
}
