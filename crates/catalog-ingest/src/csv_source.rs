//! Streaming CSV row source.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::row::{RawRow, RawValue};

/// Options for reading delimited files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvReadOptions {
    /// Field delimiter.
    /// Defaults to `,`.
    pub delimiter: char,

    /// Trim whitespace around headers and fields.
    /// Defaults to true.
    pub trim: bool,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            trim: true,
        }
    }
}

impl CsvReadOptions {
    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Enable or disable trimming.
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(IngestError::InvalidDelimiter(self.delimiter))
    }
}

/// Reads a delimited file one record at a time.
///
/// The first record is the header row; every following record becomes a
/// [`RawRow`] keyed by header name. Cells are always text; an empty cell is
/// the empty string.
pub struct CsvRowSource<R: Read> {
    source_name: String,
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
    row: u64,
}

impl CsvRowSource<BufReader<File>> {
    /// Opens a file for streaming.
    pub fn open(path: &Path, options: &CsvReadOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IngestError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IngestError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::from_reader(BufReader::new(file), path.display().to_string(), options)
    }
}

impl<R: Read> CsvRowSource<R> {
    /// Wraps any reader; `source_name` identifies it in errors.
    pub fn from_reader(
        reader: R,
        source_name: impl Into<String>,
        options: &CsvReadOptions,
    ) -> Result<Self> {
        let source_name = source_name.into();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter_byte()?)
            .trim(if options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| IngestError::Headers {
                source_name: source_name.clone(),
                source: e,
            })?
            .iter()
            .map(str::to_string)
            .collect();

        let mut seen = HashSet::new();
        if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(IngestError::DuplicateColumn {
                source_name,
                column: duplicate.clone(),
            });
        }

        tracing::debug!(source = %source_name, columns = headers.len(), "Opened CSV source");
        Ok(Self {
            source_name,
            headers,
            records: reader.into_records(),
            row: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> Iterator for CsvRowSource<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.row += 1;
        Some(match record {
            Ok(record) => Ok(self
                .headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| (header.as_str(), RawValue::from(cell)))
                .collect()),
            Err(source) => Err(IngestError::Record {
                source_name: self.source_name.clone(),
                row: self.row,
                source,
            }),
        })
    }
}
