//! CLI argument definitions for the catalog tool.

use std::path::PathBuf;

use catalog_model::EntityType;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "catalog",
    version,
    about = "Data catalog tool - import, analyze, export and publish catalog data",
    long_about = "Manage a file-backed data catalog.\n\n\
                  Imports CSV files into data sets through a schema or column mapping,\n\
                  exports data back to CSV and publishes catalogs to a target catalog."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values in logs. Values are redacted otherwise.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

/// Where the catalog lives.
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    /// Catalog file.
    #[arg(
        long = "catalog-file",
        value_name = "PATH",
        default_value = "catalog.json",
        global = true
    )]
    pub catalog_file: PathBuf,

    /// Catalog within the file.
    #[arg(long = "catalog", value_name = "NAME", default_value = "main", global = true)]
    pub catalog: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a catalog file with empty catalogs.
    Init(InitArgs),

    /// Add entities from a JSON file.
    Add(AddArgs),

    /// List entities of one type.
    List(ListArgs),

    /// Delete entities and everything depending on them.
    Remove(RemoveArgs),

    /// Suggest variable and attribute matches for a data file.
    Analyze(AnalyzeArgs),

    /// Import a data file into a data set, replacing its data.
    Import(ImportArgs),

    /// Export data to CSV.
    Export(ExportArgs),

    /// Delete data.
    Delete(DataFilterArgs),

    /// Publish the catalog to a target catalog.
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Catalog names to create (default: the --catalog name).
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Replace an existing catalog file.
    #[arg(long = "force")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// JSON array of entities, each tagged with `entityType`.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(value_enum)]
    pub entity_type: EntityTypeArg,

    /// Print JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[arg(value_enum)]
    pub entity_type: EntityTypeArg,

    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<u64>,
}

/// CSV reading flags shared by analyze and import.
#[derive(Args, Debug, Clone)]
pub struct CsvArgs {
    /// Data file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Field delimiter.
    #[arg(long = "delimiter", default_value_t = ',')]
    pub delimiter: char,

    /// Keep whitespace around cells.
    #[arg(long = "no-trim")]
    pub no_trim: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Target data set id.
    #[arg(long = "data-set", value_name = "ID")]
    pub data_set: u64,

    #[command(flatten)]
    pub csv: CsvArgs,

    /// Analyze only this column.
    #[arg(long = "column", value_name = "NAME")]
    pub column: Option<String>,

    /// Distinct values sampled per column.
    #[arg(long = "value-limit", value_name = "N")]
    pub value_limit: Option<usize>,

    /// Print JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Target data set id.
    #[arg(long = "data-set", value_name = "ID")]
    pub data_set: u64,

    #[command(flatten)]
    pub csv: CsvArgs,

    /// JSON schema file: `[{"variable": 1, "attributes": [2, 3]}, ...]`.
    #[arg(long = "schema", value_name = "FILE", conflicts_with = "columns")]
    pub schema: Option<PathBuf>,

    /// Column mapping `COLUMN=VARIABLE_ID`; repeat per column.
    #[arg(long = "column", value_name = "COLUMN=ID", value_parser = parse_column_mapping)]
    pub columns: Vec<(String, u64)>,

    /// JSON file with import options.
    #[arg(long = "options", value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Individuals written per batch.
    #[arg(long = "batch-size", value_name = "N")]
    pub batch_size: Option<usize>,

    /// Create attributes for unknown categorical values.
    #[arg(long = "create-missing-attributes")]
    pub create_missing_attributes: bool,

    /// Fail rows that contain unmapped columns.
    #[arg(long = "reject-unmapped")]
    pub reject_unmapped: bool,

    /// Skip rows that fail to import instead of aborting.
    #[arg(long = "skip-bad-rows")]
    pub skip_bad_rows: bool,
}

/// Selects data by data set, variable and attribute.
#[derive(Args, Debug, Default)]
pub struct DataFilterArgs {
    #[arg(long = "data-set", value_name = "ID")]
    pub data_sets: Vec<u64>,

    #[arg(long = "variable", value_name = "ID")]
    pub variables: Vec<u64>,

    #[arg(long = "attribute", value_name = "ID")]
    pub attributes: Vec<u64>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: DataFilterArgs,

    /// Write one CSV file per data set into this directory instead of stdout.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Apply variable display formats.
    #[arg(long = "formatted")]
    pub formatted: bool,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Catalog receiving the published entities and data.
    #[arg(long = "target", value_name = "NAME")]
    pub target: String,

    /// Publishing user id.
    #[arg(long = "user", value_name = "ID")]
    pub user: Option<u64>,
}

fn parse_column_mapping(value: &str) -> Result<(String, u64), String> {
    let (column, id) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected COLUMN=ID, got `{value}`"))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid variable id `{id}`: {e}"))?;
    Ok((column.trim().to_string(), id))
}

/// Entity type choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EntityTypeArg {
    Folder,
    DataSet,
    Variable,
    Attribute,
    User,
    Publication,
}

impl From<EntityTypeArg> for EntityType {
    fn from(arg: EntityTypeArg) -> Self {
        match arg {
            EntityTypeArg::Folder => EntityType::Folder,
            EntityTypeArg::DataSet => EntityType::DataSet,
            EntityTypeArg::Variable => EntityType::Variable,
            EntityTypeArg::Attribute => EntityType::Attribute,
            EntityTypeArg::User => EntityType::User,
            EntityTypeArg::Publication => EntityType::Publication,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
