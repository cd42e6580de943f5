//! Raw row ingestion for catalog imports.
//!
//! A raw row source is any `Iterator<Item = Result<RawRow, IngestError>>`.
//! [`CsvRowSource`] streams a delimited file one record at a time, keyed by
//! the header row; rows built in memory (or by other typed sources) use
//! [`RawRow`] directly.

mod csv_source;
mod error;
mod row;

pub use csv_source::{CsvReadOptions, CsvRowSource};
pub use error::{IngestError, Result};
pub use row::{RawRow, RawValue};
