//! Storage-independent query filters.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::ids::EntityId;

/// Predicate over entity fields.
///
/// Field names are the camelCase names entities serialize with
/// (`id`, `key`, `variable`, `scopedDataSet`, `dataModified`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    #[default]
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    Gt(String, Value),
    /// Field is absent or null.
    IsNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn any_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull(field.into())
    }

    pub fn by_id(id: EntityId) -> Self {
        Self::eq("id", id)
    }

    pub fn by_ids(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self::any_of("id", ids)
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::All => other,
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            current => Self::And(vec![current, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            current => Self::Or(vec![current, other]),
        }
    }

    /// Evaluates the filter against an entity's field view.
    pub fn matches(&self, fields: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq(field, expected) => fields.get(field).is_some_and(|v| v == expected),
            Self::In(field, expected) => fields
                .get(field)
                .is_some_and(|v| expected.iter().any(|e| e == v)),
            Self::Gt(field, bound) => fields
                .get(field)
                .and_then(|v| compare_values(v, bound))
                .is_some_and(Ordering::is_gt),
            Self::IsNull(field) => fields.get(field).is_none_or(Value::is_null),
            Self::And(filters) => filters.iter().all(|f| f.matches(fields)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(fields)),
        }
    }

    pub fn matches_entity(&self, entity: &Entity) -> bool {
        self.matches(&entity.fields())
    }
}

/// Orders two JSON scalars: timestamps, then numbers, then strings.
///
/// Returns `None` for nulls and mismatched kinds.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => {
            match (
                l.parse::<DateTime<Utc>>().ok(),
                r.parse::<DateTime<Utc>>().ok(),
            ) {
                (Some(l), Some(r)) => Some(l.cmp(&r)),
                _ => Some(l.cmp(r)),
            }
        }
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Sorting and limiting applied after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub take: Option<usize>,
}

impl QueryOptions {
    pub fn sorted_by(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort_by: Some(field.into()),
            order,
            take: None,
        }
    }

    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// Sorts (nulls last) and truncates a filtered result set.
    pub fn apply(&self, mut entities: Vec<Entity>) -> Vec<Entity> {
        if let Some(field) = &self.sort_by {
            let mut keyed: Vec<(Value, Entity)> = entities
                .into_iter()
                .map(|entity| {
                    let key = entity.fields().get(field).cloned().unwrap_or(Value::Null);
                    (key, entity)
                })
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = match (a.is_null(), b.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => return Ordering::Greater,
                    (false, true) => return Ordering::Less,
                    (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
                };
                match self.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
            entities = keyed.into_iter().map(|(_, entity)| entity).collect();
        }
        if let Some(take) = self.take {
            entities.truncate(take);
        }
        entities
    }
}

/// Selects imported data by data set, variable and attribute ids.
///
/// Empty lists mean "no restriction" on that axis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFilter {
    #[serde(default)]
    pub data_sets: Vec<EntityId>,
    #[serde(default)]
    pub variables: Vec<EntityId>,
    #[serde(default)]
    pub attributes: Vec<EntityId>,
}

impl DataFilter {
    pub fn for_data_set(data_set: EntityId) -> Self {
        Self {
            data_sets: vec![data_set],
            ..Self::default()
        }
    }

    pub fn with_data_sets(mut self, data_sets: impl IntoIterator<Item = EntityId>) -> Self {
        self.data_sets.extend(data_sets);
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = EntityId>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = EntityId>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data_sets.is_empty() && self.variables.is_empty() && self.attributes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.data_sets
            .iter()
            .chain(&self.variables)
            .chain(&self.attributes)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DataSet, Variable};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn eq_and_in_match_fields() {
        let fields = json!({"id": 72, "key": "Location", "scopedDataSet": null});

        assert!(Filter::eq("key", "Location").matches(&fields));
        assert!(!Filter::eq("key", "Year").matches(&fields));
        assert!(Filter::any_of("id", [72, 98]).matches(&fields));
        assert!(Filter::is_null("scopedDataSet").matches(&fields));
        assert!(Filter::is_null("missing").matches(&fields));
    }

    #[test]
    fn gt_compares_timestamps() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut data_set = DataSet::new("Survey").with_id(56);
        data_set.set_data_modified(later);
        let entity = Entity::from(data_set);

        assert!(Filter::gt("dataModified", earlier.to_rfc3339()).matches_entity(&entity));
        assert!(!Filter::gt("dataModified", later.to_rfc3339()).matches_entity(&entity));
    }

    #[test]
    fn and_or_compose() {
        let fields = json!({"key": "Percent", "variable": 600});
        let filter = Filter::eq("key", "Percent").and(Filter::eq("variable", 600));
        assert!(filter.matches(&fields));

        let filter = Filter::eq("key", "Year").or(Filter::eq("variable", 600));
        assert!(filter.matches(&fields));
        assert_eq!(Filter::All.and(Filter::by_id(EntityId::new(1))), Filter::by_id(EntityId::new(1)));
    }

    #[test]
    fn query_options_sort_and_take() {
        let entities = vec![
            Entity::from(Variable::text("b").with_id(2)),
            Entity::from(Variable::text("c").with_id(3)),
            Entity::from(Variable::text("a").with_id(1)),
        ];

        let sorted = QueryOptions::sorted_by("key", SortOrder::Desc)
            .with_take(2)
            .apply(entities);
        let ids: Vec<u64> = sorted.iter().map(|e| e.id().get()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn data_filter_collects_ids() {
        let filter = DataFilter::for_data_set(EntityId::new(56))
            .with_variables([EntityId::new(72)])
            .with_attributes([EntityId::new(45)]);
        let ids: Vec<u64> = filter.ids().map(EntityId::get).collect();
        assert_eq!(ids, vec![56, 72, 45]);
        assert!(DataFilter::default().is_empty());
    }
}
