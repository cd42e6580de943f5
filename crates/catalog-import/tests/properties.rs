//! Property tests for row ordering and fact typing over generated rows.

use std::collections::{BTreeMap, HashMap};

use catalog_import::{ImportOptions, ImportSummary, Importer, RowErrorPolicy};
use catalog_ingest::RawRow;
use catalog_map::MappingSource;
use catalog_model::{
    Attribute, DataFilter, DataSet, EntityId, EntityType, Fact, FixedClock, Individual, Variable,
};
use catalog_store::{CatalogStore, EntityRepository, MemoryStore};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

const CATALOG: &str = "main";
const DATA_SET: u64 = 1;
const LOCATION: u64 = 2;

fn id(value: u64) -> EntityId {
    EntityId::new(value)
}

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

/// Location (categorical), Percent (numerical) and Notes (text), plus a
/// `CT` attribute owned by an unrelated Region variable.
fn seeded_store() -> MemoryStore {
    let store = MemoryStore::with_catalogs([CATALOG]);
    let mut tx = store.begin(CATALOG).unwrap();
    tx.create_entities(vec![
        DataSet::new("Survey").with_id(DATA_SET).into(),
        Variable::categorical("Location").with_id(LOCATION).into(),
        Variable::numerical("Percent").with_id(3).into(),
        Variable::text("Notes").with_id(4).into(),
        Attribute::new("MA", LOCATION).with_id(5).into(),
        Attribute::new("NY", LOCATION).with_id(6).into(),
        Variable::categorical("Region").with_id(7).into(),
        Attribute::new("CT", 7).with_id(8).into(),
    ])
    .unwrap();
    tx.commit().unwrap();
    store
}

fn mapping() -> MappingSource {
    MappingSource::Columns(BTreeMap::from([
        ("Location".to_string(), id(LOCATION)),
        ("Percent".to_string(), id(3)),
        ("Notes".to_string(), id(4)),
    ]))
}

#[derive(Debug, Clone)]
struct Cells {
    location: String,
    percent: String,
    notes: String,
}

impl Cells {
    fn row(&self) -> RawRow {
        RawRow::new()
            .with("Location", self.location.as_str())
            .with("Percent", self.percent.as_str())
            .with("Notes", self.notes.as_str())
    }
}

fn import(
    store: &MemoryStore,
    rows: &[Cells],
    options: &ImportOptions,
) -> (ImportSummary, Vec<Individual>) {
    let clock = clock();
    let items: Vec<catalog_ingest::Result<RawRow>> = rows.iter().map(|c| Ok(c.row())).collect();
    let summary = Importer::new(store, CATALOG, &clock)
        .import(id(DATA_SET), &mapping(), items, options)
        .unwrap();

    let mut tx = store.begin(CATALOG).unwrap();
    let individuals = tx
        .query_facts(&DataFilter::for_data_set(id(DATA_SET)))
        .unwrap();
    tx.rollback().unwrap();
    (summary, individuals)
}

/// Attribute id to owning variable id.
fn attribute_owners(store: &MemoryStore) -> HashMap<EntityId, EntityId> {
    let clock = clock();
    let mut tx = store.begin(CATALOG).unwrap();
    let attributes = EntityRepository::new(&mut *tx, &clock)
        .query_all(EntityType::Attribute)
        .unwrap();
    tx.rollback().unwrap();
    attributes
        .into_iter()
        .map(|entity| {
            let attribute = Attribute::try_from(entity).unwrap();
            (attribute.id, attribute.variable)
        })
        .collect()
}

fn valid_cells() -> impl Strategy<Value = Cells> {
    (
        prop::sample::select(vec!["MA", "NY", ""]),
        prop_oneof![
            (-1.0e9f64..1.0e9).prop_map(|value| value.to_string()),
            Just(String::new()),
        ],
        ".{0,12}",
    )
        .prop_map(|(location, percent, notes)| Cells {
            location: location.to_string(),
            percent,
            notes,
        })
}

fn any_cells() -> impl Strategy<Value = Cells> {
    (
        prop_oneof![
            prop::sample::select(vec!["MA", "NY", "CT", ""]).prop_map(String::from),
            "[A-Z]{1,3}",
        ],
        prop_oneof![
            (-1.0e9f64..1.0e9).prop_map(|value| format!("${value}%")),
            "[a-z$%]{0,4}",
        ],
        ".{0,12}",
    )
        .prop_map(|(location, percent, notes)| Cells {
            location,
            percent,
            notes,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn successful_rows_are_numbered_in_source_order(
        rows in prop::collection::vec(valid_cells(), 0..40)
    ) {
        let store = seeded_store();
        let options = ImportOptions::default().with_batch_size(7);
        let (summary, individuals) = import(&store, &rows, &options);

        prop_assert_eq!(summary.rows_written, rows.len());
        let ids: Vec<u64> = individuals.iter().map(|i| i.id).collect();
        let expected: Vec<u64> = (1..=rows.len() as u64).collect();
        prop_assert_eq!(ids, expected);

        for (individual, cells) in individuals.iter().zip(&rows) {
            prop_assert_eq!(
                &individual.facts[2],
                &Fact::text(id(4), Some(cells.notes.clone()))
            );
        }
    }

    #[test]
    fn facts_fit_their_variable_type(
        rows in prop::collection::vec(any_cells(), 1..30)
    ) {
        let store = seeded_store();
        let options = ImportOptions::default()
            .with_create_missing_attributes(true)
            .with_row_errors(RowErrorPolicy::Skip);
        let (summary, individuals) = import(&store, &rows, &options);
        let owners = attribute_owners(&store);

        prop_assert_eq!(summary.rows_written + summary.rows_skipped, rows.len());
        prop_assert_eq!(individuals.len(), summary.rows_written);

        let mut referenced = Vec::new();
        for individual in &individuals {
            let cells = &rows[(individual.id - 1) as usize];
            for fact in &individual.facts {
                match fact {
                    Fact::Categorical { attribute, .. } => {
                        if let Some(attribute) = attribute {
                            prop_assert_eq!(owners.get(attribute), Some(&id(LOCATION)));
                            referenced.push(*attribute);
                        }
                    }
                    Fact::Numerical { value, .. } => {
                        if let Some(value) = value {
                            prop_assert!(value.is_finite());
                        }
                    }
                    Fact::Text { value, .. } => {
                        prop_assert_eq!(value.as_deref(), Some(cells.notes.as_str()));
                    }
                }
            }
        }

        // Attributes created for skipped rows would be unreferenced.
        for created in &summary.created_attributes {
            prop_assert!(referenced.contains(created), "unreferenced attribute {}", created);
        }
    }
}
