//! Export of imported catalog data.
//!
//! - [`export_csv`] / [`export_tables`]: one CSV table per data set.
//! - [`DataFormatter`]: `number` and `percent` display formats for
//!   numerical variables.

pub mod csv_export;
pub mod error;
pub mod format;

pub use csv_export::{CsvExport, DataSetTable, ExportOptions, export_csv, export_tables};
pub use error::{ExportError, Result};
pub use format::DataFormatter;
