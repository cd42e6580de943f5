//! Column analysis against a seeded catalog.

use catalog_ingest::{CsvReadOptions, CsvRowSource, RawRow};
use catalog_map::{AnalyzeOptions, MapError, analyze};
use catalog_model::{Attribute, DataSet, EntityId, SystemClock, Variable, VariableType};
use catalog_store::{CatalogStore, EntityRepository, MemoryStore};

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::with_catalogs(["main"]);
    let mut tx = store.begin("main").unwrap();
    tx.create_entities(vec![
        DataSet::new("Survey").with_id(56).into(),
        DataSet::new("Other").with_id(57).into(),
        Variable::categorical("Location").with_id(72).into(),
        Variable::categorical("Year").with_id(98).into(),
        Variable::numerical("Percent").with_id(600).into(),
        Variable::numerical("Percent").with_id(601).scoped_to(56).into(),
        Variable::text("Notes").with_id(700).scoped_to(57).into(),
        Attribute::new("MA", 72).with_id(45).into(),
        Attribute::new("NY", 72).with_id(76).into(),
        Attribute::new("2012", 98).with_id(4).into(),
    ])
    .unwrap();
    tx.commit().unwrap();
    store
}

fn csv_rows(input: &str) -> Vec<catalog_ingest::Result<RawRow>> {
    CsvRowSource::from_reader(input.as_bytes(), "inline", &CsvReadOptions::default())
        .unwrap()
        .collect()
}

const DATA: &str = "Location,Year,Percent,Notes\nMA,2012,45%,a\nCT,2012,50%,b\nNY,,55%,c\n";

#[test]
fn reports_variable_and_attribute_matches() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let report = analyze(
        &mut repo,
        EntityId::new(56),
        csv_rows(DATA),
        &AnalyzeOptions::default(),
    )
    .unwrap();

    let keys: Vec<&str> = report.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["Location", "Year", "Percent", "Notes"]);

    let location = &report[0];
    assert!(location.matched);
    assert_eq!(location.variable, Some(EntityId::new(72)));
    let matched: Vec<(&str, Option<bool>)> = location
        .values
        .iter()
        .map(|v| (v.value.as_str(), v.matched))
        .collect();
    assert_eq!(
        matched,
        vec![("MA", Some(true)), ("CT", Some(false)), ("NY", Some(true))]
    );

    // Blank values are not sampled.
    assert_eq!(report[1].values.len(), 1);
}

#[test]
fn local_variable_wins_over_global() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let local = analyze(&mut repo, EntityId::new(56), csv_rows(DATA), &AnalyzeOptions::default())
        .unwrap();
    assert_eq!(local[2].variable, Some(EntityId::new(601)));
    assert_eq!(local[2].variable_type, Some(VariableType::Numerical));
    assert_eq!(local[2].values[0].matched, None);
    // Notes is local to another data set.
    assert!(!local[3].matched);

    let other = analyze(&mut repo, EntityId::new(57), csv_rows(DATA), &AnalyzeOptions::default())
        .unwrap();
    assert_eq!(other[2].variable, Some(EntityId::new(600)));
    assert_eq!(other[3].variable, Some(EntityId::new(700)));
}

#[test]
fn single_column_analysis() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let options = AnalyzeOptions::default().with_column("Location").with_value_limit(2);
    let report = analyze(&mut repo, EntityId::new(56), csv_rows(DATA), &options).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].values.len(), 2);

    let options = AnalyzeOptions::default().with_column("Region");
    let err = analyze(&mut repo, EntityId::new(56), csv_rows(DATA), &options).unwrap_err();
    assert!(matches!(err, MapError::MissingColumn(ref column) if column == "Region"));
    assert_eq!(err.to_string(), "Data file does not contain column Region");
}

#[test]
fn report_serializes_in_camel_case() {
    let store = seeded_store();
    let clock = SystemClock;
    let mut tx = store.begin("main").unwrap();
    let mut repo = EntityRepository::new(&mut *tx, &clock);

    let options = AnalyzeOptions::default().with_column("Year");
    let report = analyze(&mut repo, EntityId::new(56), csv_rows(DATA), &options).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "key": "Year",
            "matched": true,
            "variable": 98,
            "variableType": "categorical",
            "values": [{"value": "2012", "matched": true, "attribute": 4}]
        }])
    );
}
