//! Mapping resolution and column analysis.
//!
//! [`resolve`] turns a [`MappingSource`] into a [`Mapping`]: the per-column
//! lookup table the individual generator consults for every cell.
//! [`analyze`] scans a data file that has no mapping yet and reports which
//! columns and values already match catalog variables and attributes.

mod analyzer;
mod error;
mod mapping;
mod resolver;

pub use analyzer::{AnalyzeOptions, ColumnMatch, ValueMatch, analyze};
pub use error::{Inconsistency, MapError, Result};
pub use mapping::{ColumnMapping, Mapping, MappingMode, MappingSource};
pub use resolver::{check_source, resolve};
