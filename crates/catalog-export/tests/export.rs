//! CSV export against a seeded in-memory catalog.

use catalog_export::{ExportError, ExportOptions, export_csv, export_tables};
use catalog_model::{
    Attribute, DataFilter, DataSet, EntityId, Fact, FormatKind, FormatOptions, Individual,
    SystemClock, ValueFormat, Variable,
};
use catalog_store::{CatalogStore, EntityRepository, MemoryStore, StoreError};

fn id(value: u64) -> EntityId {
    EntityId::new(value)
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::with_catalogs(["main"]);
    let mut tx = store.begin("main").unwrap();
    tx.create_entities(vec![
        DataSet::new("Survey").with_id(56).into(),
        DataSet::new("Empty").with_id(57).into(),
        Variable::categorical("Location").with_id(72).into(),
        Variable::numerical("Percent")
            .with_id(600)
            .with_format(ValueFormat {
                kind: FormatKind::Percent,
                options: FormatOptions::default(),
            })
            .into(),
        Variable::text("Notes").with_id(700).into(),
        Attribute::new("MA", 72).with_id(45).into(),
        Attribute::new("NY", 72).with_id(76).into(),
    ])
    .unwrap();
    tx.create_facts(vec![
        Individual::new(
            1,
            id(56),
            vec![
                Fact::categorical(id(72), Some(id(45))),
                Fact::numerical(id(600), Some(0.45)),
                Fact::text(id(700), Some("a, b".to_string())),
            ],
        ),
        Individual::new(
            2,
            id(56),
            vec![
                Fact::categorical(id(72), None),
                Fact::numerical(id(600), None),
                Fact::text(id(700), None),
            ],
        ),
        Individual::new(
            3,
            id(56),
            vec![
                Fact::numerical(id(600), Some(0.5)),
                Fact::categorical(id(72), Some(id(76))),
            ],
        ),
    ])
    .unwrap();
    tx.commit().unwrap();
    store
}

#[test]
fn exports_raw_values_by_header() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let exports = export_csv(
        &mut repo,
        &DataFilter::for_data_set(id(56)),
        &ExportOptions::default(),
    )
    .unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].data_set.name, "Survey");
    insta::assert_snapshot!(exports[0].csv.trim_end(), @r#"
    Location,Percent,Notes
    MA,0.45,"a, b"
    ,,
    NY,0.5,
    "#);
}

#[test]
fn formatted_export_applies_variable_formats() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let options = ExportOptions::default().with_formatted(true);
    let exports = export_csv(&mut repo, &DataFilter::for_data_set(id(56)), &options).unwrap();
    insta::assert_snapshot!(exports[0].csv.trim_end(), @r#"
    Location,Percent,Notes
    MA,45%,"a, b"
    ,,
    NY,50%,
    "#);
}

#[test]
fn variable_filter_projects_columns() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let filter = DataFilter::for_data_set(id(56)).with_variables([id(600), id(700)]);
    let tables = export_tables(&mut repo, &filter, &ExportOptions::default()).unwrap();
    assert_eq!(tables[0].headers, vec!["Percent", "Notes"]);
    assert_eq!(tables[0].rows[0], vec!["0.45", "a, b"]);
}

#[test]
fn data_sets_without_data_are_not_exported() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let exports = export_csv(
        &mut repo,
        &DataFilter::for_data_set(id(57)),
        &ExportOptions::default(),
    )
    .unwrap();
    assert!(exports.is_empty());
}

#[test]
fn zero_ids_are_rejected() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let err = export_csv(
        &mut repo,
        &DataFilter::for_data_set(EntityId::UNASSIGNED),
        &ExportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExportError::Store(StoreError::InvalidFilter(_))));
    assert_eq!(err.to_string(), "Invalid filter parameters. Bad id: 0");
}
