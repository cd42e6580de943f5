//! Publishing a catalog snapshot to another catalog.

use catalog_model::{
    Clock, DataSet, Entity, EntityId, EntityType, Filter, Publication, QueryOptions, SortOrder,
};
use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::repository::EntityRepository;
use crate::store::{CatalogStore, StoreTransaction};

/// Outcome of one publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSummary {
    pub entities: usize,
    pub data_sets: Vec<EntityId>,
    pub individuals: usize,
    pub publication: Publication,
}

/// Publishes `source` to `target`.
///
/// Copies every entity, then the data of data sets modified since the last
/// publish to the same target (every data set on the first publish), and
/// records a [`Publication`] in `source`. Runs in one transaction.
pub fn publish<S>(
    store: &S,
    clock: &dyn Clock,
    source: &str,
    target: &str,
    user: Option<EntityId>,
) -> Result<PublishSummary>
where
    S: CatalogStore + ?Sized,
{
    if source == target {
        return Err(StoreError::InvalidEntity(format!(
            "cannot publish catalog {source} to itself"
        )));
    }

    let span = tracing::info_span!("publish", source, destination = target);
    let _guard = span.enter();

    let mut tx = store.begin(source)?;
    let outcome = publish_in(&mut *tx, clock, target, user);
    match outcome {
        Ok(summary) => {
            tx.commit()?;
            tracing::info!(
                entities = summary.entities,
                data_sets = summary.data_sets.len(),
                individuals = summary.individuals,
                "Publish complete"
            );
            Ok(summary)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::error!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

fn publish_in<T>(
    tx: &mut T,
    clock: &dyn Clock,
    target: &str,
    user: Option<EntityId>,
) -> Result<PublishSummary>
where
    T: StoreTransaction + ?Sized,
{
    let mut repo = EntityRepository::new(tx, clock);

    let last_publish = repo
        .query(
            EntityType::Publication,
            &Filter::eq("target", target),
            &QueryOptions::sorted_by("created", SortOrder::Desc).with_take(1),
        )?
        .into_iter()
        .next()
        .and_then(|entity| entity.created())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let changed: Vec<EntityId> = repo
        .query(
            EntityType::DataSet,
            &Filter::gt("dataModified", last_publish.to_rfc3339()),
            &QueryOptions::default(),
        )?
        .into_iter()
        .map(DataSet::try_from)
        .map(|data_set| data_set.map(|d| d.id))
        .collect::<std::result::Result<_, _>>()?;

    let entities = repo.transaction().publish_entities(target, &EntityType::ALL)?;
    let individuals = repo.transaction().publish_facts(target, &changed)?;

    let created = repo.create(vec![Entity::from(Publication::new(target, user))])?;
    let publication = created
        .into_iter()
        .next()
        .map(Publication::try_from)
        .transpose()?
        .ok_or_else(|| StoreError::Backend("store returned no publication".to_string()))?;

    Ok(PublishSummary {
        entities,
        data_sets: changed,
        individuals,
        publication,
    })
}
