//! Streaming import of tabular rows into catalog data sets.
//!
//! An import resolves a column mapping, turns each raw row into an
//! [`Individual`](catalog_model::Individual) of typed facts and writes them
//! in batches, all inside one store transaction.
//!
//! # Example
//!
//! ```ignore
//! use catalog_import::{ImportOptions, Importer};
//! use catalog_map::MappingSource;
//!
//! let importer = Importer::new(&store, "main", &clock);
//! let rows = CsvRowSource::open(path, &CsvReadOptions::default())?;
//! let summary = importer.import(data_set, &MappingSource::DataSetSchema, rows, &ImportOptions::default())?;
//! ```

pub mod cleaner;
pub mod error;
pub mod generator;
pub mod importer;
pub mod options;
pub mod schema;

pub use cleaner::{clean_numerical, numerical_value};
pub use error::{ImportError, Result, RowError, RowErrorKind};
pub use generator::{IndividualGenerator, Individuals};
pub use importer::{ImportSummary, Importer, TransactionScope};
pub use options::{ImportOptions, RowErrorPolicy, UnmappedColumnPolicy};
pub use schema::SchemaTally;
