//! Import orchestration.
//!
//! An import replaces all data of one data set inside a single transaction:
//! existing facts are deleted, the mapping is resolved, rows are pulled one
//! at a time through the [`IndividualGenerator`] and written in batches, and
//! the data set's metadata is updated last. Any failure rolls everything
//! back.

use catalog_ingest::RawRow;
use catalog_map::{MappingMode, MappingSource, check_source, resolve};
use catalog_model::{Clock, DataFilter, EntityId, Individual, SchemaEntry};
use catalog_store::{CatalogStore, EntityRepository, StoreTransaction};
use serde::Serialize;

use crate::error::{ImportError, Result};
use crate::generator::IndividualGenerator;
use crate::options::{ImportOptions, RowErrorPolicy};
use crate::schema::SchemaTally;

/// Outcome of a committed import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub data_set: EntityId,
    /// Individuals written.
    pub rows_written: usize,
    /// Rows dropped under [`RowErrorPolicy::Skip`].
    pub rows_skipped: usize,
    /// `create_facts` calls made.
    pub batches: usize,
    /// Individuals removed before writing.
    pub individuals_replaced: usize,
    pub created_attributes: Vec<EntityId>,
    /// Schema of the data set after the import.
    pub schema: Vec<SchemaEntry>,
}

/// Owns a transaction until it is committed or rolled back.
///
/// Commit and rollback each end the scope; whichever comes first wins and
/// the other becomes an error or a no-op. A scope dropped while still active
/// rolls back.
pub struct TransactionScope<'a> {
    tx: Option<Box<dyn StoreTransaction + 'a>>,
}

impl<'a> TransactionScope<'a> {
    pub fn new(tx: Box<dyn StoreTransaction + 'a>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn transaction(&mut self) -> Result<&mut (dyn StoreTransaction + 'a)> {
        self.tx.as_deref_mut().ok_or(ImportError::TransactionEnded)
    }

    pub fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(ImportError::TransactionEnded)?;
        tx.commit()?;
        Ok(())
    }

    /// Rolls back if still active. Returns whether a rollback happened.
    pub fn rollback(&mut self) -> Result<bool> {
        match self.tx.take() {
            Some(tx) => {
                tx.rollback()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::warn!(catalog = tx.catalog(), "Transaction dropped while active, rolling back");
            if let Err(err) = tx.rollback() {
                tracing::error!(error = %err, "Rollback failed");
            }
        }
    }
}

/// Imports rows into data sets of one catalog.
pub struct Importer<'s, S: CatalogStore + ?Sized> {
    store: &'s S,
    catalog: String,
    clock: &'s dyn Clock,
}

impl<'s, S: CatalogStore + ?Sized> Importer<'s, S> {
    pub fn new(store: &'s S, catalog: impl Into<String>, clock: &'s dyn Clock) -> Self {
        Self {
            store,
            catalog: catalog.into(),
            clock,
        }
    }

    /// Replaces all data of `data_set` with the individuals built from `rows`.
    ///
    /// Preconditions are checked before a transaction is opened. On any
    /// failure the transaction is rolled back once and the original error is
    /// returned; commit only happens after every write succeeded.
    pub fn import<I>(
        &self,
        data_set: EntityId,
        source: &MappingSource,
        rows: I,
        options: &ImportOptions,
    ) -> Result<ImportSummary>
    where
        I: IntoIterator<Item = catalog_ingest::Result<RawRow>>,
    {
        options.validate()?;
        check_source(source)?;

        let span = tracing::info_span!(
            "import",
            catalog = %self.catalog,
            data_set = %data_set,
            mode = ?source.mode()
        );
        let _guard = span.enter();

        let mut scope = TransactionScope::new(self.store.begin(&self.catalog)?);
        let outcome = scope
            .transaction()
            .and_then(|tx| self.run(tx, data_set, source, rows, options));

        match outcome {
            Ok(summary) => {
                scope.commit()?;
                tracing::info!(
                    rows = summary.rows_written,
                    skipped = summary.rows_skipped,
                    batches = summary.batches,
                    created_attributes = summary.created_attributes.len(),
                    "Import committed"
                );
                Ok(summary)
            }
            Err(err) => {
                tracing::error!(error = %err, "Import failed, rolling back");
                if let Err(rollback_err) = scope.rollback() {
                    tracing::error!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    fn run<T, I>(
        &self,
        tx: &mut T,
        data_set: EntityId,
        source: &MappingSource,
        rows: I,
        options: &ImportOptions,
    ) -> Result<ImportSummary>
    where
        T: StoreTransaction + ?Sized,
        I: IntoIterator<Item = catalog_ingest::Result<RawRow>>,
    {
        let mut repo = EntityRepository::new(tx, self.clock);
        // Fails early with NotFound before anything is deleted.
        repo.data_set(data_set)?;

        let replaced = repo
            .transaction()
            .delete_facts(&DataFilter::for_data_set(data_set))?;
        tracing::debug!(individuals = replaced, "Deleted existing data");

        let mapping = resolve(&mut repo, data_set, source)?;
        let mode = mapping.mode();
        let mut generator = IndividualGenerator::new(data_set, mapping, options);
        let mut tally = SchemaTally::default();
        let mut batch: Vec<Individual> = Vec::with_capacity(options.batch_size);
        let mut written = 0usize;
        let mut skipped = 0usize;
        let mut batches = 0usize;

        for row in rows {
            let row = row?;
            match generator.transform(&row, &mut repo) {
                Ok(individual) => {
                    tally.observe(&individual);
                    batch.push(individual);
                }
                Err(ImportError::Row(err)) if options.row_errors == RowErrorPolicy::Skip => {
                    tracing::warn!(row = err.row, reason = err.kind.label(), "Skipped row");
                    skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            }
            if batch.len() == options.batch_size {
                written += write_batch(repo.transaction(), &mut batch)?;
                batches += 1;
            }
        }
        if !batch.is_empty() {
            written += write_batch(repo.transaction(), &mut batch)?;
            batches += 1;
        }
        tracing::debug!(rows = generator.rows_seen(), skipped, "Rows transformed");

        let mut record = repo.data_set(data_set)?;
        record.set_data_modified(self.clock.now());
        if mode == MappingMode::Columns {
            record.schema = Some(tally.into_schema());
        }
        let schema = record.schema.clone().unwrap_or_default();
        repo.update(vec![record.into()])?;

        Ok(ImportSummary {
            data_set,
            rows_written: written,
            rows_skipped: skipped,
            batches,
            individuals_replaced: replaced,
            created_attributes: generator.created_attributes().to_vec(),
            schema,
        })
    }
}

fn write_batch<T>(tx: &mut T, batch: &mut Vec<Individual>) -> Result<usize>
where
    T: StoreTransaction + ?Sized,
{
    let individuals = std::mem::take(batch);
    let count = individuals.len();
    tx.create_facts(individuals)?;
    tracing::debug!(individuals = count, "Wrote batch");
    Ok(count)
}
