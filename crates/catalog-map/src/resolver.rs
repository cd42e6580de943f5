//! Mapping resolution against catalog entities.
//!
//! Resolution fetches every referenced variable in one query and every
//! referenced attribute in one more. Ids that do not resolve never fail
//! resolution on their own; they surface later, per row, as unmapped columns.

use std::collections::{BTreeMap, HashMap};

use catalog_model::{Attribute, EntityId, Filter, SchemaEntry, Variable};
use catalog_store::{EntityRepository, StoreTransaction};

use crate::error::{Inconsistency, MapError, Result};
use crate::mapping::{ColumnMapping, Mapping, MappingMode, MappingSource};

/// Rejects mapping sources that can never import anything.
///
/// Run before opening a transaction.
pub fn check_source(source: &MappingSource) -> Result<()> {
    match source {
        MappingSource::Schema(entries) if entries.is_empty() => Err(MapError::EmptySchema),
        MappingSource::Columns(columns) if columns.is_empty() => {
            Err(MapError::EmptyColumnMapping)
        }
        _ => Ok(()),
    }
}

/// Resolves `source` for an import into `data_set`.
pub fn resolve<T>(
    repo: &mut EntityRepository<'_, T>,
    data_set: EntityId,
    source: &MappingSource,
) -> Result<Mapping>
where
    T: StoreTransaction + ?Sized,
{
    check_source(source)?;
    let mapping = match source {
        MappingSource::Schema(entries) => resolve_schema(repo, data_set, entries)?,
        MappingSource::DataSetSchema => {
            let schema = repo
                .data_set(data_set)?
                .schema
                .filter(|entries| !entries.is_empty())
                .ok_or(MapError::MissingDataSetSchema { data_set })?;
            resolve_schema(repo, data_set, &schema)?
        }
        MappingSource::Columns(columns) => resolve_columns(repo, data_set, columns)?,
    };

    tracing::debug!(
        data_set = %data_set,
        mode = ?mapping.mode(),
        columns = mapping.len(),
        unresolved = mapping.unresolved().len(),
        "Resolved mapping"
    );
    Ok(mapping)
}

fn resolve_schema<T>(
    repo: &mut EntityRepository<'_, T>,
    data_set: EntityId,
    entries: &[SchemaEntry],
) -> Result<Mapping>
where
    T: StoreTransaction + ?Sized,
{
    let variables = fetch_variables(repo, entries.iter().map(|entry| entry.variable))?;
    let attribute_ids: Vec<EntityId> = entries
        .iter()
        .flat_map(|entry| entry.attribute_ids().iter().copied())
        .collect();
    let attributes: HashMap<EntityId, Attribute> = if attribute_ids.is_empty() {
        HashMap::new()
    } else {
        repo.attributes(&Filter::by_ids(attribute_ids))?
            .into_iter()
            .map(|attribute| (attribute.id, attribute))
            .collect()
    };

    let mut problems = Vec::new();
    for entry in entries {
        if let Some(variable) = variables.get(&entry.variable) {
            check_scope(variable, data_set, &mut problems);
        }
        for attribute_id in entry.attribute_ids() {
            if let Some(attribute) = attributes.get(attribute_id)
                && attribute.variable != entry.variable
            {
                problems.push(Inconsistency::ForeignAttribute {
                    variable: entry.variable,
                    attribute: *attribute_id,
                    owner: attribute.variable,
                });
            }
        }
    }
    if !problems.is_empty() {
        return Err(MapError::Consistency(problems));
    }

    let mut mapping = Mapping::new(MappingMode::Schema);
    let mut scoped_keys: Vec<String> = Vec::new();
    for entry in entries {
        let Some(variable) = variables.get(&entry.variable) else {
            tracing::warn!(variable = %entry.variable, "Schema variable not found");
            mapping.mark_unresolved(entry.variable);
            continue;
        };
        let is_local = variable.scoped_data_set == Some(data_set);
        // A local variable wins over a global one with the same key.
        if scoped_keys.contains(&variable.key) && !is_local {
            continue;
        }
        if is_local {
            scoped_keys.push(variable.key.clone());
        }
        let listed = entry
            .attribute_ids()
            .iter()
            .filter_map(|id| attributes.get(id).cloned());
        mapping.insert(variable.key.clone(), ColumnMapping::new(Some(variable.clone()), listed));
    }
    Ok(mapping)
}

fn resolve_columns<T>(
    repo: &mut EntityRepository<'_, T>,
    data_set: EntityId,
    columns: &BTreeMap<String, EntityId>,
) -> Result<Mapping>
where
    T: StoreTransaction + ?Sized,
{
    let variables = fetch_variables(repo, columns.values().copied())?;

    let mut problems = Vec::new();
    for variable in variables.values() {
        check_scope(variable, data_set, &mut problems);
    }
    if !problems.is_empty() {
        return Err(MapError::Consistency(problems));
    }

    let mut by_variable: HashMap<EntityId, Vec<Attribute>> = HashMap::new();
    if !variables.is_empty() {
        let filter = Filter::any_of("variable", variables.keys().copied());
        for attribute in repo.attributes(&filter)? {
            by_variable.entry(attribute.variable).or_default().push(attribute);
        }
    }

    let mut mapping = Mapping::new(MappingMode::Columns);
    for (column, variable_id) in columns {
        let variable = variables.get(variable_id).cloned();
        if variable.is_none() {
            tracing::warn!(column = %column, variable = %variable_id, "Mapped variable not found");
        }
        let attributes = by_variable.get(variable_id).cloned().unwrap_or_default();
        mapping.insert(column.clone(), ColumnMapping::new(variable, attributes));
    }
    Ok(mapping)
}

fn fetch_variables<T>(
    repo: &mut EntityRepository<'_, T>,
    ids: impl Iterator<Item = EntityId>,
) -> Result<HashMap<EntityId, Variable>>
where
    T: StoreTransaction + ?Sized,
{
    let ids: Vec<EntityId> = ids.collect();
    Ok(repo
        .variables(&Filter::by_ids(ids))?
        .into_iter()
        .map(|variable| (variable.id, variable))
        .collect())
}

fn check_scope(variable: &Variable, data_set: EntityId, problems: &mut Vec<Inconsistency>) {
    if let Some(scoped_data_set) = variable.scoped_data_set
        && scoped_data_set != data_set
    {
        problems.push(Inconsistency::ForeignScope {
            variable: variable.id,
            scoped_data_set,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_model::{DataSet, SystemClock};
    use catalog_store::{CatalogStore, MemoryStore};

    fn store() -> MemoryStore {
        let store = MemoryStore::with_catalogs(["main"]);
        let mut tx = store.begin("main").unwrap();
        tx.create_entities(vec![
            DataSet::new("Survey").with_id(56).into(),
            Variable::categorical("Location").with_id(72).into(),
            Variable::categorical("Location")
                .with_id(73)
                .with_key("loc")
                .into(),
            Variable::numerical("Percent").with_id(600).into(),
            Attribute::new("MA", 72).with_id(45).into(),
            Attribute::new("NY", 72).with_id(76).into(),
            Attribute::new("MA-Keyed", 73).with_id(77).into(),
        ])
        .unwrap();
        tx.commit().unwrap();
        store
    }

    #[test]
    fn empty_sources_fail_the_precondition() {
        assert!(matches!(
            check_source(&MappingSource::Schema(vec![])),
            Err(MapError::EmptySchema)
        ));
        assert!(matches!(
            check_source(&MappingSource::Columns(BTreeMap::new())),
            Err(MapError::EmptyColumnMapping)
        ));
        assert!(check_source(&MappingSource::DataSetSchema).is_ok());
    }

    #[test]
    fn schema_mode_keys_by_variable_key() {
        let store = store();
        let clock = SystemClock;
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let source = MappingSource::Schema(vec![
            SchemaEntry::new(73u64).with_attributes([77u64]),
            SchemaEntry::new(600u64),
        ]);
        let mapping = resolve(&mut repo, EntityId::new(56), &source).unwrap();

        let column = mapping.column("loc").unwrap();
        assert_eq!(column.variable.as_ref().map(|v| v.id), Some(EntityId::new(73)));
        assert_eq!(column.attribute("MA-Keyed").map(|a| a.id), Some(EntityId::new(77)));
        assert!(mapping.column("Percent").is_some());
        assert!(mapping.column("Location").is_none());
    }

    #[test]
    fn foreign_attributes_are_aggregated() {
        let store = store();
        let clock = SystemClock;
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let source = MappingSource::Schema(vec![
            SchemaEntry::new(72u64).with_attributes([45u64, 77]),
            SchemaEntry::new(73u64).with_attributes([76u64]),
        ]);
        let err = resolve(&mut repo, EntityId::new(56), &source).unwrap_err();
        let problems = match err {
            MapError::Consistency(problems) => problems,
            other => panic!("expected consistency error, got {other:?}"),
        };
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn unresolved_schema_variables_are_skipped() {
        let store = store();
        let clock = SystemClock;
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let source = MappingSource::Schema(vec![SchemaEntry::new(999u64), SchemaEntry::new(600u64)]);
        let mapping = resolve(&mut repo, EntityId::new(56), &source).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.unresolved(), &[EntityId::new(999)]);
    }

    #[test]
    fn column_mode_loads_all_attributes_of_mapped_variables() {
        let store = store();
        let clock = SystemClock;
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let columns = BTreeMap::from([
            ("State".to_string(), EntityId::new(72)),
            ("Missing".to_string(), EntityId::new(999)),
        ]);
        let mapping = resolve(&mut repo, EntityId::new(56), &MappingSource::Columns(columns)).unwrap();

        let state = mapping.column("State").unwrap();
        assert_eq!(state.attributes.len(), 2);
        assert!(state.attribute("NY").is_some());
        assert!(mapping.column("Missing").unwrap().variable.is_none());
    }

    #[test]
    fn data_set_without_schema_is_rejected() {
        let store = store();
        let clock = SystemClock;
        let mut tx = store.begin("main").unwrap();
        let mut repo = EntityRepository::new(&mut *tx, &clock);

        let err = resolve(&mut repo, EntityId::new(56), &MappingSource::DataSetSchema).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Data Set Schema. The Schema must be configured before importing data."
        );
    }
}
