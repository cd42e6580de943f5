//! Row to individual transformation.

use catalog_ingest::{RawRow, RawValue};
use catalog_map::Mapping;
use catalog_model::{Attribute, EntityId, Fact, Individual, VariableType};
use catalog_store::AttributeCreator;

use crate::cleaner::numerical_value;
use crate::error::{ImportError, Result, RowError, RowErrorKind};
use crate::options::{ImportOptions, UnmappedColumnPolicy};

/// Turns raw rows into individuals of one data set.
///
/// Every row passed to [`transform`](Self::transform) takes the next
/// 1-based ordinal as its individual id, whether it succeeds or not.
#[derive(Debug)]
pub struct IndividualGenerator {
    data_set: EntityId,
    mapping: Mapping,
    create_missing_attributes: bool,
    unmapped_columns: UnmappedColumnPolicy,
    row: u64,
    created: Vec<EntityId>,
}

impl IndividualGenerator {
    pub fn new(data_set: EntityId, mapping: Mapping, options: &ImportOptions) -> Self {
        Self {
            data_set,
            mapping,
            create_missing_attributes: options.create_missing_attributes,
            unmapped_columns: options.unmapped_columns,
            row: 0,
            created: Vec::new(),
        }
    }

    /// Transforms one row.
    ///
    /// Categorical values must match an attribute key exactly. Unknown ones
    /// go through `creator` when auto-creation is enabled, but only once
    /// every cell of the row has passed; the new attribute is remembered so
    /// later rows reuse it. Row failures are [`ImportError::Row`]; a failing
    /// `creator` surfaces as [`ImportError::Store`].
    pub fn transform(&mut self, row: &RawRow, creator: &mut dyn AttributeCreator) -> Result<Individual> {
        self.row += 1;
        let ordinal = self.row;
        let fail = |kind| ImportError::Row(RowError::new(ordinal, kind));

        let mut facts = Vec::with_capacity(row.len());
        let mut pending = Vec::new();
        for (column, value) in row.iter() {
            let Some(mapped) = self.mapping.column(column) else {
                match self.unmapped_columns {
                    UnmappedColumnPolicy::Ignore => continue,
                    UnmappedColumnPolicy::Reject => {
                        return Err(fail(RowErrorKind::InvalidColumn {
                            column: column.to_string(),
                        }));
                    }
                }
            };
            let Some(variable) = &mapped.variable else {
                return Err(fail(RowErrorKind::InvalidColumn {
                    column: column.to_string(),
                }));
            };

            let fact = match variable.kind {
                VariableType::Categorical if value.is_blank() => Fact::categorical(variable.id, None),
                VariableType::Categorical => {
                    let key = value.to_string();
                    match mapped.attribute(&key) {
                        Some(attribute) => Fact::categorical(variable.id, Some(attribute.id)),
                        None if self.create_missing_attributes => {
                            pending.push(PendingAttribute {
                                fact: facts.len(),
                                column: column.to_string(),
                                variable: variable.id,
                                key,
                            });
                            Fact::categorical(variable.id, None)
                        }
                        None => {
                            return Err(fail(RowErrorKind::InvalidAttribute {
                                variable: variable.key.clone(),
                                value: key,
                            }));
                        }
                    }
                }
                VariableType::Numerical => match numerical_value(value) {
                    Ok(number) => Fact::numerical(variable.id, number),
                    Err(raw) => {
                        return Err(fail(RowErrorKind::NonNumerical {
                            variable: variable.key.clone(),
                            value: raw,
                        }));
                    }
                },
                VariableType::Text => Fact::text(variable.id, text_value(value)),
            };
            facts.push(fact);
        }

        for attribute in pending {
            let id = self.create_attribute(&attribute, creator)?;
            facts[attribute.fact] = Fact::categorical(attribute.variable, Some(id));
        }

        Ok(Individual::new(ordinal, self.data_set, facts))
    }

    /// Iterator adapter over a row source.
    ///
    /// Source errors come through as [`ImportError::Ingest`] items and do not
    /// consume a row ordinal.
    pub fn individuals<'g, I>(
        &'g mut self,
        source: I,
        creator: &'g mut dyn AttributeCreator,
    ) -> Individuals<'g, I::IntoIter>
    where
        I: IntoIterator<Item = catalog_ingest::Result<RawRow>>,
    {
        Individuals {
            generator: self,
            source: source.into_iter(),
            creator,
        }
    }

    /// Attributes created so far, in creation order.
    pub fn created_attributes(&self) -> &[EntityId] {
        &self.created
    }

    /// Rows transformed so far, failed ones included.
    pub fn rows_seen(&self) -> u64 {
        self.row
    }

    fn create_attribute(
        &mut self,
        pending: &PendingAttribute,
        creator: &mut dyn AttributeCreator,
    ) -> Result<EntityId> {
        let attribute = creator.create_attribute(
            Attribute::new(pending.key.as_str(), pending.variable).with_key(pending.key.as_str()),
        )?;
        let id = attribute.id;
        tracing::info!(
            row = self.row,
            variable = %pending.variable,
            attribute = %id,
            "Created missing attribute"
        );
        self.created.push(id);
        self.mapping.remember_attribute(&pending.column, attribute);
        Ok(id)
    }
}

/// Categorical cell whose attribute is created once the row is known good.
#[derive(Debug)]
struct PendingAttribute {
    fact: usize,
    column: String,
    variable: EntityId,
    key: String,
}

fn text_value(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        RawValue::Text(text) => Some(text.clone()),
        RawValue::Number(number) => Some(number.to_string()),
    }
}

/// Individuals produced from a row source; see
/// [`IndividualGenerator::individuals`].
pub struct Individuals<'g, I> {
    generator: &'g mut IndividualGenerator,
    source: I,
    creator: &'g mut dyn AttributeCreator,
}

impl<I> Iterator for Individuals<'_, I>
where
    I: Iterator<Item = catalog_ingest::Result<RawRow>>,
{
    type Item = Result<Individual>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.source.next()? {
            Ok(row) => self.generator.transform(&row, &mut *self.creator),
            Err(err) => Err(err.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_map::{ColumnMapping, MappingMode};
    use catalog_model::Variable;
    use catalog_store::StoreError;

    /// Hands out ids from 1000 and counts calls.
    #[derive(Default)]
    struct CountingCreator {
        calls: usize,
    }

    impl AttributeCreator for CountingCreator {
        fn create_attribute(&mut self, attribute: Attribute) -> catalog_store::Result<Attribute> {
            self.calls += 1;
            Ok(attribute.with_id(1000 + self.calls as u64))
        }
    }

    struct FailingCreator;

    impl AttributeCreator for FailingCreator {
        fn create_attribute(&mut self, _attribute: Attribute) -> catalog_store::Result<Attribute> {
            Err(StoreError::Backend("attribute store offline".to_string()))
        }
    }

    fn mapping() -> Mapping {
        let mut mapping = Mapping::new(MappingMode::Columns);
        mapping.insert(
            "Location",
            ColumnMapping::new(
                Some(Variable::categorical("Location").with_id(72)),
                [Attribute::new("MA", 72).with_id(45)],
            ),
        );
        mapping.insert(
            "Percent",
            ColumnMapping::new(Some(Variable::numerical("Percent").with_id(600)), []),
        );
        mapping.insert(
            "Notes",
            ColumnMapping::new(Some(Variable::text("Notes").with_id(700)), []),
        );
        mapping.insert("Broken", ColumnMapping::new(None, []));
        mapping
    }

    fn generator(options: &ImportOptions) -> IndividualGenerator {
        IndividualGenerator::new(EntityId::new(56), mapping(), options)
    }

    #[test]
    fn builds_typed_facts_in_row_order() {
        let mut generator = generator(&ImportOptions::default());
        let row = RawRow::new()
            .with("Notes", " keep  spacing ")
            .with("Location", "MA")
            .with("Percent", "45%")
            .with("Extra", "ignored");

        let individual = generator.transform(&row, &mut CountingCreator::default()).unwrap();
        assert_eq!(individual.id, 1);
        assert_eq!(
            individual.facts,
            vec![
                Fact::text(EntityId::new(700), Some(" keep  spacing ".to_string())),
                Fact::categorical(EntityId::new(72), Some(EntityId::new(45))),
                Fact::numerical(EntityId::new(600), Some(45.0)),
            ]
        );
    }

    #[test]
    fn blanks_become_null_facts() {
        let mut generator = generator(&ImportOptions::default());
        let row = RawRow::new()
            .with("Location", "")
            .with("Percent", " ")
            .with("Notes", RawValue::Null);

        let individual = generator.transform(&row, &mut CountingCreator::default()).unwrap();
        assert!(individual.facts.iter().all(Fact::is_null));
    }

    #[test]
    fn unresolved_variable_fails_the_row() {
        let mut generator = generator(&ImportOptions::default());
        let err = generator
            .transform(&RawRow::new().with("Broken", "x"), &mut CountingCreator::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error: Row 1. Invalid mapping for column: Broken");
    }

    #[test]
    fn reject_policy_fails_unmapped_columns() {
        let options = ImportOptions::default().with_unmapped_columns(UnmappedColumnPolicy::Reject);
        let mut generator = generator(&options);
        let err = generator
            .transform(&RawRow::new().with("Extra", "x"), &mut CountingCreator::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error: Row 1. Invalid mapping for column: Extra");
    }

    #[test]
    fn unknown_attribute_without_auto_create() {
        let mut generator = generator(&ImportOptions::default());
        let mut creator = CountingCreator::default();
        let err = generator
            .transform(&RawRow::new().with("Location", "CT"), &mut creator)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Row 1. Invalid mapping for attribute: Location: CT"
        );
        assert_eq!(creator.calls, 0);
    }

    #[test]
    fn created_attributes_are_reused() {
        let options = ImportOptions::default().with_create_missing_attributes(true);
        let mut generator = generator(&options);
        let mut creator = CountingCreator::default();

        let rows: Vec<catalog_ingest::Result<RawRow>> = ["CT", "NY", "CT", "MA"]
            .into_iter()
            .map(|value| Ok(RawRow::new().with("Location", value)))
            .collect();
        let attributes: Vec<Option<EntityId>> = generator
            .individuals(rows, &mut creator)
            .map(|individual| individual.unwrap().facts[0].attribute())
            .collect();

        assert_eq!(
            attributes,
            vec![
                Some(EntityId::new(1001)),
                Some(EntityId::new(1002)),
                Some(EntityId::new(1001)),
                Some(EntityId::new(45)),
            ]
        );
        assert_eq!(creator.calls, 2);
        assert_eq!(
            generator.created_attributes(),
            &[EntityId::new(1001), EntityId::new(1002)]
        );
    }

    #[test]
    fn failed_row_creates_no_attribute() {
        let options = ImportOptions::default().with_create_missing_attributes(true);
        let mut generator = generator(&options);
        let mut creator = CountingCreator::default();

        let bad = RawRow::new().with("Location", "CT").with("Percent", "bad");
        let err = generator.transform(&bad, &mut creator).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Row(RowError {
                row: 1,
                kind: RowErrorKind::NonNumerical { .. },
            })
        ));
        assert_eq!(creator.calls, 0);
        assert!(generator.created_attributes().is_empty());

        let good = RawRow::new().with("Location", "CT").with("Percent", "2");
        let individual = generator.transform(&good, &mut creator).unwrap();
        assert_eq!(individual.id, 2);
        assert_eq!(individual.facts[0].attribute(), Some(EntityId::new(1001)));
        assert_eq!(generator.created_attributes(), &[EntityId::new(1001)]);
    }

    #[test]
    fn attribute_keys_match_exactly() {
        let mut generator = generator(&ImportOptions::default());
        let err = generator
            .transform(&RawRow::new().with("Location", " MA "), &mut CountingCreator::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Row 1. Invalid mapping for attribute: Location:  MA "
        );
    }

    #[test]
    fn created_attribute_keeps_the_exact_value_as_key() {
        let options = ImportOptions::default().with_create_missing_attributes(true);
        let mut generator = generator(&options);
        let mut creator = CountingCreator::default();

        for _ in 0..2 {
            generator
                .transform(&RawRow::new().with("Location", " CT"), &mut creator)
                .unwrap();
        }
        assert_eq!(creator.calls, 1);
    }

    #[test]
    fn creator_failure_is_a_store_error() {
        let options = ImportOptions::default().with_create_missing_attributes(true);
        let mut generator = generator(&options);
        let err = generator
            .transform(&RawRow::new().with("Location", "CT"), &mut FailingCreator)
            .unwrap_err();
        assert!(matches!(err, ImportError::Store(StoreError::Backend(_))));
    }

    #[test]
    fn failed_rows_still_consume_an_ordinal() {
        let mut generator = generator(&ImportOptions::default());
        let rows: Vec<catalog_ingest::Result<RawRow>> = vec![
            Ok(RawRow::new().with("Percent", "1")),
            Ok(RawRow::new().with("Percent", "oops")),
            Ok(RawRow::new().with("Percent", "3")),
        ];
        let results: Vec<Result<Individual>> = generator
            .individuals(rows, &mut CountingCreator::default())
            .collect();

        assert_eq!(results[0].as_ref().unwrap().id, 1);
        assert!(matches!(
            results[1],
            Err(ImportError::Row(RowError { row: 2, .. }))
        ));
        assert_eq!(results[2].as_ref().unwrap().id, 3);
        assert_eq!(generator.rows_seen(), 3);
    }
}
