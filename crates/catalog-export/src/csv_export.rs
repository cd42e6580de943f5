//! CSV export of imported data.
//!
//! Each exported data set becomes one table. The header is the variable keys
//! of the first individual's facts, in fact order; every individual becomes
//! one row with categorical facts written as their attribute key, numbers and
//! text as-is and missing values as empty cells.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use catalog_model::{
    Attribute, DataFilter, DataSet, EntityId, EntityType, Fact, Filter, Individual, QueryOptions,
    Variable,
};
use catalog_store::{DataSetData, EntityRepository, StoreError, StoreTransaction, query_data};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::format::DataFormatter;

/// Options for CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Apply each numerical variable's display format.
    pub formatted: bool,
}

impl ExportOptions {
    pub fn with_formatted(mut self, formatted: bool) -> Self {
        self.formatted = formatted;
        self
    }
}

/// Exported rows of one data set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetTable {
    pub data_set: DataSet,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataSetTable {
    /// Writes the table as comma-separated values.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        if !self.headers.is_empty() {
            csv.write_record(&self.headers)?;
        }
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        // Every cell came from a `String`.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// CSV text of one data set.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub data_set: DataSet,
    pub csv: String,
}

/// Builds export tables for the data selected by `filter`.
pub fn export_tables<T>(
    repo: &mut EntityRepository<'_, T>,
    filter: &DataFilter,
    options: &ExportOptions,
) -> Result<Vec<DataSetTable>>
where
    T: StoreTransaction + ?Sized,
{
    let groups = query_data(repo.transaction(), filter)?;
    let lookup = Lookup::load(repo, &groups)?;
    let formatter = DataFormatter::new();

    let tables = groups
        .iter()
        .map(|group| -> Result<DataSetTable> {
            let data_set = lookup
                .data_sets
                .get(&group.data_set)
                .cloned()
                .ok_or(StoreError::NotFound {
                    entity_type: EntityType::DataSet,
                    id: group.data_set,
                })?;
            let headers = headers(&group.data, &lookup)?;
            let rows = group
                .data
                .iter()
                .map(|individual| row(individual, &headers, &lookup, options, &formatter))
                .collect::<Result<Vec<_>>>()?;
            Ok(DataSetTable {
                data_set,
                headers,
                rows,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        catalog = repo.transaction().catalog(),
        data_sets = tables.len(),
        rows = tables.iter().map(|t| t.rows.len()).sum::<usize>(),
        "Exported data"
    );
    Ok(tables)
}

/// Exports the data selected by `filter` as CSV text, one entry per data
/// set.
pub fn export_csv<T>(
    repo: &mut EntityRepository<'_, T>,
    filter: &DataFilter,
    options: &ExportOptions,
) -> Result<Vec<CsvExport>>
where
    T: StoreTransaction + ?Sized,
{
    export_tables(repo, filter, options)?
        .into_iter()
        .map(|table| -> Result<CsvExport> {
            let csv = table.to_csv()?;
            Ok(CsvExport {
                data_set: table.data_set,
                csv,
            })
        })
        .collect()
}

/// Entities referenced by the exported data.
struct Lookup {
    data_sets: HashMap<EntityId, DataSet>,
    variables: HashMap<EntityId, Variable>,
    attributes: HashMap<EntityId, Attribute>,
}

impl Lookup {
    fn load<T>(repo: &mut EntityRepository<'_, T>, groups: &[DataSetData]) -> Result<Self>
    where
        T: StoreTransaction + ?Sized,
    {
        let facts = groups
            .iter()
            .flat_map(|group| &group.data)
            .flat_map(|individual| &individual.facts);
        let mut variable_ids = BTreeSet::new();
        let mut attribute_ids = BTreeSet::new();
        for fact in facts {
            variable_ids.insert(fact.variable());
            if let Some(attribute) = fact.attribute() {
                attribute_ids.insert(attribute);
            }
        }

        let data_sets = if groups.is_empty() {
            HashMap::new()
        } else {
            repo.query(
                EntityType::DataSet,
                &Filter::by_ids(groups.iter().map(|group| group.data_set)),
                &QueryOptions::default(),
            )?
            .into_iter()
            .map(|entity| DataSet::try_from(entity).map(|d| (d.id, d)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(StoreError::from)?
        };
        let variables = if variable_ids.is_empty() {
            HashMap::new()
        } else {
            repo.variables(&Filter::by_ids(variable_ids))?
                .into_iter()
                .map(|v| (v.id, v))
                .collect()
        };
        let attributes = if attribute_ids.is_empty() {
            HashMap::new()
        } else {
            repo.attributes(&Filter::by_ids(attribute_ids))?
                .into_iter()
                .map(|a| (a.id, a))
                .collect()
        };

        Ok(Self {
            data_sets,
            variables,
            attributes,
        })
    }

    fn variable(&self, id: EntityId) -> Result<&Variable> {
        self.variables.get(&id).ok_or(ExportError::MissingVariable(id))
    }
}

fn headers(data: &[Individual], lookup: &Lookup) -> Result<Vec<String>> {
    let Some(first) = data.first() else {
        return Ok(Vec::new());
    };
    first
        .facts
        .iter()
        .map(|fact| -> Result<String> { Ok(lookup.variable(fact.variable())?.key.clone()) })
        .collect()
}

fn row(
    individual: &Individual,
    headers: &[String],
    lookup: &Lookup,
    options: &ExportOptions,
    formatter: &DataFormatter,
) -> Result<Vec<String>> {
    let mut cells: HashMap<&str, String> = HashMap::with_capacity(individual.facts.len());
    for fact in &individual.facts {
        let variable = lookup.variable(fact.variable())?;
        cells.insert(variable.key.as_str(), cell(fact, variable, lookup, options, formatter)?);
    }
    Ok(headers
        .iter()
        .map(|header| cells.remove(header.as_str()).unwrap_or_default())
        .collect())
}

fn cell(
    fact: &Fact,
    variable: &Variable,
    lookup: &Lookup,
    options: &ExportOptions,
    formatter: &DataFormatter,
) -> Result<String> {
    Ok(match fact {
        Fact::Categorical { attribute: None, .. } => String::new(),
        Fact::Categorical {
            attribute: Some(attribute),
            ..
        } => lookup
            .attributes
            .get(attribute)
            .map(|a| a.key.clone())
            .ok_or(ExportError::MissingAttribute(*attribute))?,
        Fact::Numerical { value, .. } if options.formatted => formatter.format(variable, *value),
        Fact::Numerical { value, .. } => value
            .filter(|v| !v.is_nan())
            .map(|v| v.to_string())
            .unwrap_or_default(),
        Fact::Text { value, .. } => value.clone().unwrap_or_default(),
    })
}
