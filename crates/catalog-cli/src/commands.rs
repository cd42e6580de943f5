//! Command implementations.
//!
//! Every command loads the catalog file, works on one catalog through a
//! store transaction and saves the file again when it changed something.
//! Results are returned to the caller for printing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, info_span};

use catalog_export::{CsvExport, ExportOptions, export_csv};
use catalog_import::{ImportOptions, ImportSummary, Importer, RowErrorPolicy, UnmappedColumnPolicy};
use catalog_ingest::{CsvReadOptions, CsvRowSource};
use catalog_map::{AnalyzeOptions, ColumnMatch, MappingSource, analyze};
use catalog_model::{
    DataFilter, Entity, EntityId, EntityType, Filter, QueryOptions, SchemaEntry, SortOrder,
    SystemClock,
};
use catalog_store::{
    CatalogStore, EntityRepository, MemoryStore, PublishSummary, delete_data, load_catalog_file,
    publish, save_catalog_file,
};

use crate::cli::{
    AddArgs, AnalyzeArgs, CsvArgs, DataFilterArgs, ExportArgs, ImportArgs, InitArgs, ListArgs,
    PublishArgs, RemoveArgs, StoreArgs,
};
use crate::logging::redact_value;

/// Files written by an export, or the CSV text when printing to stdout.
#[derive(Debug)]
pub struct ExportOutcome {
    pub exports: Vec<CsvExport>,
    pub written: Vec<PathBuf>,
}

pub fn run_init(store_args: &StoreArgs, args: &InitArgs) -> Result<Vec<String>> {
    let path = &store_args.catalog_file;
    if path.exists() && !args.force {
        bail!(
            "catalog file {} already exists (use --force to replace it)",
            path.display()
        );
    }
    let names = if args.names.is_empty() {
        vec![store_args.catalog.clone()]
    } else {
        args.names.clone()
    };
    let store = MemoryStore::with_catalogs(names);
    save_catalog_file(&store, path)
        .with_context(|| format!("write catalog file {}", path.display()))?;
    let catalogs = store.catalogs()?;
    info!(path = %path.display(), catalogs = catalogs.len(), "Created catalog file");
    Ok(catalogs)
}

pub fn run_add(store_args: &StoreArgs, args: &AddArgs) -> Result<Vec<Entity>> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let entities: Vec<Entity> = serde_json::from_str(&text)
        .with_context(|| format!("parse entities from {}", args.file.display()))?;

    let store = open_store(store_args)?;
    let created = {
        let clock = SystemClock;
        let mut tx = store.begin(&store_args.catalog)?;
        let created = EntityRepository::new(&mut *tx, &clock).create(entities)?;
        tx.commit()?;
        created
    };
    save_store(&store, store_args)?;
    info!(created = created.len(), "Added entities");
    Ok(created)
}

pub fn run_list(store_args: &StoreArgs, args: &ListArgs) -> Result<Vec<Entity>> {
    let store = open_store(store_args)?;
    let clock = SystemClock;
    let mut tx = store.begin(&store_args.catalog)?;
    let entities = EntityRepository::new(&mut *tx, &clock).query(
        args.entity_type.into(),
        &Filter::All,
        &QueryOptions::sorted_by("id", SortOrder::Asc),
    )?;
    tx.rollback()?;
    Ok(entities)
}

pub fn run_remove(store_args: &StoreArgs, args: &RemoveArgs) -> Result<usize> {
    let entity_type: EntityType = args.entity_type.into();
    let ids: Vec<EntityId> = args.ids.iter().copied().map(EntityId::new).collect();

    let store = open_store(store_args)?;
    let removed = {
        let clock = SystemClock;
        let mut tx = store.begin(&store_args.catalog)?;
        let removed = EntityRepository::new(&mut *tx, &clock).delete(entity_type, &ids)?;
        tx.commit()?;
        removed
    };
    save_store(&store, store_args)?;
    info!(entity_type = %entity_type, removed, "Removed entities");
    Ok(removed)
}

pub fn run_analyze(store_args: &StoreArgs, args: &AnalyzeArgs) -> Result<Vec<ColumnMatch>> {
    let store = open_store(store_args)?;
    let rows = open_rows(&args.csv)?;

    let mut options = AnalyzeOptions::default();
    if let Some(limit) = args.value_limit {
        options = options.with_value_limit(limit);
    }
    if let Some(column) = &args.column {
        options = options.with_column(column.clone());
    }

    let clock = SystemClock;
    let mut tx = store.begin(&store_args.catalog)?;
    let matches = analyze(
        &mut EntityRepository::new(&mut *tx, &clock),
        EntityId::new(args.data_set),
        rows,
        &options,
    )?;
    tx.rollback()?;

    for column in &matches {
        for value in column.values.iter().filter(|value| value.matched == Some(false)) {
            debug!(
                column = %column.key,
                value = redact_value(&value.value),
                "Value has no matching attribute"
            );
        }
    }
    Ok(matches)
}

pub fn run_import(store_args: &StoreArgs, args: &ImportArgs) -> Result<ImportSummary> {
    let span = info_span!("import_command", file = %args.csv.file.display());
    let _guard = span.enter();

    let source = mapping_source(args)?;
    let options = import_options(args)?;
    debug!(?options, mode = ?source.mode(), "Resolved import settings");

    let store = open_store(store_args)?;
    let rows = open_rows(&args.csv)?;
    let clock = SystemClock;
    let summary = Importer::new(&store, store_args.catalog.clone(), &clock).import(
        EntityId::new(args.data_set),
        &source,
        rows,
        &options,
    )?;
    save_store(&store, store_args)?;
    Ok(summary)
}

pub fn run_export(store_args: &StoreArgs, args: &ExportArgs) -> Result<ExportOutcome> {
    let store = open_store(store_args)?;
    let filter = data_filter(&args.filter);
    let options = ExportOptions::default().with_formatted(args.formatted);

    let exports = {
        let clock = SystemClock;
        let mut tx = store.begin(&store_args.catalog)?;
        let exports = export_csv(&mut EntityRepository::new(&mut *tx, &clock), &filter, &options)?;
        tx.rollback()?;
        exports
    };

    let mut written = Vec::new();
    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        for export in &exports {
            let path = dir.join(export_file_name(export));
            fs::write(&path, &export.csv).with_context(|| format!("write {}", path.display()))?;
            debug!(path = %path.display(), "Wrote export");
            written.push(path);
        }
    }
    Ok(ExportOutcome { exports, written })
}

pub fn run_delete(store_args: &StoreArgs, args: &DataFilterArgs) -> Result<usize> {
    let filter = data_filter(args);
    if filter.is_empty() {
        bail!("refusing to delete all data; pass --data-set, --variable or --attribute");
    }

    let store = open_store(store_args)?;
    let removed = {
        let mut tx = store.begin(&store_args.catalog)?;
        let removed = delete_data(&mut *tx, &filter)?;
        tx.commit()?;
        removed
    };
    save_store(&store, store_args)?;
    Ok(removed)
}

pub fn run_publish(store_args: &StoreArgs, args: &PublishArgs) -> Result<PublishSummary> {
    let store = open_store(store_args)?;
    if !store.catalogs()?.contains(&args.target) {
        store.create_catalog(&args.target)?;
        info!(catalog = %args.target, "Created target catalog");
    }
    let summary = publish(
        &store,
        &SystemClock,
        &store_args.catalog,
        &args.target,
        args.user.map(EntityId::new),
    )?;
    save_store(&store, store_args)?;
    Ok(summary)
}

fn open_store(store_args: &StoreArgs) -> Result<MemoryStore> {
    let path = &store_args.catalog_file;
    load_catalog_file(path).with_context(|| format!("load catalog file {}", path.display()))
}

fn save_store(store: &MemoryStore, store_args: &StoreArgs) -> Result<()> {
    let path = &store_args.catalog_file;
    save_catalog_file(store, path).with_context(|| format!("save catalog file {}", path.display()))
}

fn open_rows(args: &CsvArgs) -> Result<CsvRowSource<std::io::BufReader<fs::File>>> {
    let options = CsvReadOptions::default()
        .with_delimiter(args.delimiter)
        .with_trim(!args.no_trim);
    Ok(CsvRowSource::open(&args.file, &options)?)
}

fn mapping_source(args: &ImportArgs) -> Result<MappingSource> {
    if let Some(path) = &args.schema {
        if !args.columns.is_empty() {
            bail!("--schema and --column cannot be combined");
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let schema: Vec<SchemaEntry> = serde_json::from_str(&text)
            .with_context(|| format!("parse schema from {}", path.display()))?;
        return Ok(MappingSource::Schema(schema));
    }
    if args.columns.is_empty() {
        return Ok(MappingSource::DataSetSchema);
    }
    let mut columns = BTreeMap::new();
    for (column, variable) in &args.columns {
        if columns.insert(column.clone(), EntityId::new(*variable)).is_some() {
            bail!("column {column} is mapped more than once");
        }
    }
    Ok(MappingSource::Columns(columns))
}

/// Options file first, then flags on top.
fn import_options(args: &ImportArgs) -> Result<ImportOptions> {
    let mut options = match &args.options {
        Some(path) => read_options(path)?,
        None => ImportOptions::default(),
    };
    if let Some(size) = args.batch_size {
        options = options.with_batch_size(size);
    }
    if args.create_missing_attributes {
        options = options.with_create_missing_attributes(true);
    }
    if args.reject_unmapped {
        options = options.with_unmapped_columns(UnmappedColumnPolicy::Reject);
    }
    if args.skip_bad_rows {
        options = options.with_row_errors(RowErrorPolicy::Skip);
    }
    Ok(options)
}

fn read_options(path: &Path) -> Result<ImportOptions> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse import options from {}", path.display()))
}

fn data_filter(args: &DataFilterArgs) -> DataFilter {
    DataFilter::default()
        .with_data_sets(args.data_sets.iter().copied().map(EntityId::new))
        .with_variables(args.variables.iter().copied().map(EntityId::new))
        .with_attributes(args.attributes.iter().copied().map(EntityId::new))
}

/// `<id>-<name>.csv` with anything outside `[A-Za-z0-9_-]` replaced.
fn export_file_name(export: &CsvExport) -> String {
    let name: String = export
        .data_set
        .name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}.csv", export.data_set.id, name)
}
