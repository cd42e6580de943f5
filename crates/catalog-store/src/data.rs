//! Data query and delete over imported individuals.

use std::collections::BTreeMap;

use catalog_model::{DataFilter, EntityId, Individual};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::StoreTransaction;

/// Individuals of one data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetData {
    pub data_set: EntityId,
    pub data: Vec<Individual>,
}

/// Reads data selected by `filter`, grouped by data set.
///
/// An attribute restriction keeps individuals holding any of the attributes;
/// a variable restriction projects each individual to those variables.
pub fn query_data<T>(tx: &mut T, filter: &DataFilter) -> Result<Vec<DataSetData>>
where
    T: StoreTransaction + ?Sized,
{
    validate_filter(filter)?;
    let individuals = tx.query_facts(filter)?;

    let mut grouped: BTreeMap<EntityId, Vec<Individual>> = BTreeMap::new();
    for individual in individuals {
        grouped
            .entry(individual.data_set)
            .or_default()
            .push(individual);
    }

    tracing::debug!(
        catalog = tx.catalog(),
        data_sets = grouped.len(),
        "Queried data"
    );
    Ok(grouped
        .into_iter()
        .map(|(data_set, data)| DataSetData { data_set, data })
        .collect())
}

/// Deletes data selected by `filter`.
///
/// A data-set-only filter removes whole individuals. Variable and attribute
/// restrictions remove the matching facts; individuals left without facts are
/// dropped.
pub fn delete_data<T>(tx: &mut T, filter: &DataFilter) -> Result<usize>
where
    T: StoreTransaction + ?Sized,
{
    validate_filter(filter)?;
    let removed = tx.delete_facts(filter)?;
    tracing::info!(catalog = tx.catalog(), removed, "Deleted data");
    Ok(removed)
}

fn validate_filter(filter: &DataFilter) -> Result<()> {
    match filter.ids().find(|id| !id.is_assigned()) {
        Some(bad) => Err(StoreError::InvalidFilter(bad)),
        None => Ok(()),
    }
}

/// Applies the attribute and variable restrictions of `filter` to the
/// individuals of one data set.
pub(crate) fn select_individuals(individuals: &[Individual], filter: &DataFilter) -> Vec<Individual> {
    individuals
        .iter()
        .filter(|individual| {
            filter.attributes.is_empty()
                || filter
                    .attributes
                    .iter()
                    .any(|attribute| individual.has_attribute(*attribute))
        })
        .map(|individual| {
            if filter.variables.is_empty() {
                individual.clone()
            } else {
                let facts = individual
                    .facts
                    .iter()
                    .filter(|fact| filter.variables.contains(&fact.variable()))
                    .cloned()
                    .collect();
                Individual::new(individual.id, individual.data_set, facts)
            }
        })
        .collect()
}

/// Removes the data selected by `filter` from one data set's individuals.
///
/// Returns the number of individuals removed or changed.
pub(crate) fn remove_facts(individuals: &mut Vec<Individual>, filter: &DataFilter) -> usize {
    if filter.variables.is_empty() && filter.attributes.is_empty() {
        let removed = individuals.len();
        individuals.clear();
        return removed;
    }

    let mut touched = 0;
    for individual in individuals.iter_mut() {
        let before = individual.facts.len();
        individual.facts.retain(|fact| {
            !filter.variables.contains(&fact.variable())
                && !fact
                    .attribute()
                    .is_some_and(|attribute| filter.attributes.contains(&attribute))
        });
        if individual.facts.len() != before {
            touched += 1;
        }
    }
    individuals.retain(|individual| !individual.facts.is_empty());
    touched
}
