//! Column analysis: suggests variable and attribute matches for a data file
//! before any mapping exists.

use std::collections::{HashMap, HashSet};

use catalog_ingest::{RawRow, RawValue};
use catalog_model::{Attribute, EntityId, Filter, Variable, VariableType};
use catalog_store::{EntityRepository, StoreTransaction};
use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

/// Options for column analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeOptions {
    /// Distinct sample values kept per column.
    /// Defaults to 100.
    pub value_limit: usize,

    /// Analyze only this column.
    pub column: Option<String>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            value_limit: 100,
            column: None,
        }
    }
}

impl AnalyzeOptions {
    pub fn with_value_limit(mut self, limit: usize) -> Self {
        self.value_limit = limit;
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// Match report for one distinct column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMatch {
    pub value: String,
    /// Only reported for categorical variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<EntityId>,
}

/// Match report for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMatch {
    pub key: String,
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<VariableType>,
    pub values: Vec<ValueMatch>,
}

#[derive(Default)]
struct ColumnSample {
    values: Vec<String>,
    seen: HashSet<String>,
}

impl ColumnSample {
    fn observe(&mut self, value: &RawValue, limit: usize) {
        if value.is_blank() || self.values.len() >= limit {
            return;
        }
        let text = value.to_string();
        if self.seen.insert(text.clone()) {
            self.values.push(text);
        }
    }
}

/// Scans `rows` and matches their columns against catalog variables.
///
/// Columns match variables by key, then by name. A variable local to
/// `data_set` beats a global one; variables local to other data sets are
/// never offered. Values of categorical matches are matched against the
/// variable's attributes the same way.
pub fn analyze<T, I>(
    repo: &mut EntityRepository<'_, T>,
    data_set: EntityId,
    rows: I,
    options: &AnalyzeOptions,
) -> Result<Vec<ColumnMatch>>
where
    T: StoreTransaction + ?Sized,
    I: IntoIterator<Item = catalog_ingest::Result<RawRow>>,
{
    let mut order: Vec<String> = Vec::new();
    let mut samples: HashMap<String, ColumnSample> = HashMap::new();
    let mut rows_read = 0usize;

    for row in rows {
        let row = row?;
        rows_read += 1;
        match &options.column {
            Some(column) => {
                let value = row
                    .get(column)
                    .ok_or_else(|| MapError::MissingColumn(column.clone()))?;
                if order.is_empty() {
                    order.push(column.clone());
                }
                samples
                    .entry(column.clone())
                    .or_default()
                    .observe(value, options.value_limit);
            }
            None => {
                for (key, value) in row.iter() {
                    if !samples.contains_key(key) {
                        order.push(key.to_string());
                    }
                    samples
                        .entry(key.to_string())
                        .or_default()
                        .observe(value, options.value_limit);
                }
            }
        }
    }

    let variables = locate_variables(repo, data_set, &order)?;
    let attributes = locate_attributes(repo, variables.values())?;

    let report: Vec<ColumnMatch> = order
        .iter()
        .map(|key| {
            let values = samples.remove(key).map(|s| s.values).unwrap_or_default();
            build_match(key, variables.get(key), &attributes, values)
        })
        .collect();

    tracing::info!(
        data_set = %data_set,
        rows = rows_read,
        columns = report.len(),
        matched = report.iter().filter(|c| c.matched).count(),
        "Analyzed columns"
    );
    Ok(report)
}

fn locate_variables<T>(
    repo: &mut EntityRepository<'_, T>,
    data_set: EntityId,
    keys: &[String],
) -> Result<HashMap<String, Variable>>
where
    T: StoreTransaction + ?Sized,
{
    if keys.is_empty() {
        return Ok(HashMap::new());
    }
    let candidates: Vec<Variable> = repo
        .variables(
            &Filter::any_of("key", keys.iter().map(String::as_str))
                .or(Filter::any_of("name", keys.iter().map(String::as_str))),
        )?
        .into_iter()
        .filter(|variable| variable.is_visible_in(data_set))
        .collect();

    let mut located = HashMap::new();
    for key in keys {
        let pick = |by_key: bool, local: bool| {
            candidates.iter().find(|v| {
                let same = if by_key { v.key == *key } else { v.name.trim() == key.as_str() };
                same && (v.scoped_data_set == Some(data_set)) == local
            })
        };
        if let Some(variable) = pick(true, true)
            .or_else(|| pick(true, false))
            .or_else(|| pick(false, true))
            .or_else(|| pick(false, false))
        {
            located.insert(key.clone(), variable.clone());
        }
    }
    Ok(located)
}

fn locate_attributes<'v, T>(
    repo: &mut EntityRepository<'_, T>,
    variables: impl Iterator<Item = &'v Variable>,
) -> Result<HashMap<EntityId, Vec<Attribute>>>
where
    T: StoreTransaction + ?Sized,
{
    let categorical: Vec<EntityId> = variables
        .filter(|variable| variable.kind == VariableType::Categorical)
        .map(|variable| variable.id)
        .collect();
    if categorical.is_empty() {
        return Ok(HashMap::new());
    }

    let mut by_variable: HashMap<EntityId, Vec<Attribute>> = HashMap::new();
    for attribute in repo.attributes(&Filter::any_of("variable", categorical))? {
        by_variable.entry(attribute.variable).or_default().push(attribute);
    }
    Ok(by_variable)
}

fn build_match(
    key: &str,
    variable: Option<&Variable>,
    attributes: &HashMap<EntityId, Vec<Attribute>>,
    values: Vec<String>,
) -> ColumnMatch {
    let Some(variable) = variable else {
        return ColumnMatch {
            key: key.to_string(),
            matched: false,
            variable: None,
            variable_type: None,
            values: values.into_iter().map(unmatched_value).collect(),
        };
    };

    let values = if variable.kind == VariableType::Categorical {
        let known = attributes.get(&variable.id).map(Vec::as_slice).unwrap_or_default();
        values
            .into_iter()
            .map(|value| {
                let attribute = known
                    .iter()
                    .find(|a| a.key == value)
                    .or_else(|| known.iter().find(|a| a.name.trim() == value));
                ValueMatch {
                    matched: Some(attribute.is_some()),
                    attribute: attribute.map(|a| a.id),
                    value,
                }
            })
            .collect()
    } else {
        values.into_iter().map(unmatched_value).collect()
    };

    ColumnMatch {
        key: key.to_string(),
        matched: true,
        variable: Some(variable.id),
        variable_type: Some(variable.kind),
        values,
    }
}

fn unmatched_value(value: String) -> ValueMatch {
    ValueMatch {
        value,
        matched: None,
        attribute: None,
    }
}
