use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use catalog_import::ImportSummary;
use catalog_map::ColumnMatch;
use catalog_model::{Entity, SchemaEntry};
use catalog_store::PublishSummary;

use crate::commands::ExportOutcome;

pub fn print_import_summary(summary: &ImportSummary) {
    println!("Data set: {}", summary.data_set);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Step"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![
        Cell::new("Individuals replaced"),
        Cell::new(summary.individuals_replaced),
    ]);
    table.add_row(vec![Cell::new("Rows written"), Cell::new(summary.rows_written)]);
    table.add_row(vec![
        Cell::new("Rows skipped"),
        count_cell(summary.rows_skipped, Color::Yellow),
    ]);
    table.add_row(vec![Cell::new("Batches"), Cell::new(summary.batches)]);
    table.add_row(vec![
        Cell::new("Attributes created"),
        count_cell(summary.created_attributes.len(), Color::Green),
    ]);
    println!("{table}");
    if !summary.schema.is_empty() {
        println!("Schema: {}", schema_text(&summary.schema));
    }
}

pub fn print_entities(entities: &[Entity]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Name"),
        header_cell("Key"),
        header_cell("Details"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for entity in entities {
        let (name, key, details) = entity_columns(entity);
        table.add_row(vec![
            Cell::new(entity.id()),
            Cell::new(name),
            key.map_or_else(|| dim_cell("-"), Cell::new),
            details.map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{table}");
}

pub fn print_column_matches(matches: &[ColumnMatch]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Variable"),
        header_cell("Type"),
        header_cell("Values"),
        header_cell("Unmatched"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for column in matches {
        let unmatched: Vec<&str> = column
            .values
            .iter()
            .filter(|value| value.matched == Some(false))
            .map(|value| value.value.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(&column.key).add_attribute(Attribute::Bold),
            match column.variable {
                Some(id) => Cell::new(id).fg(Color::Green),
                None => Cell::new("no match").fg(Color::Red),
            },
            column
                .variable_type
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(column.values.len()),
            if unmatched.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(unmatched.join(", ")).fg(Color::Yellow)
            },
        ]);
    }
    println!("{table}");
}

pub fn print_export(outcome: &ExportOutcome) {
    if outcome.written.is_empty() {
        for export in &outcome.exports {
            print!("{}", export.csv);
        }
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Data set"), header_cell("File")]);
    apply_table_style(&mut table);
    for (export, path) in outcome.exports.iter().zip(&outcome.written) {
        table.add_row(vec![
            Cell::new(&export.data_set.name),
            Cell::new(path.display()),
        ]);
    }
    println!("{table}");
}

pub fn print_publish_summary(summary: &PublishSummary) {
    println!("Published to: {}", summary.publication.target);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Entities"), Cell::new(summary.entities)]);
    table.add_row(vec![
        Cell::new("Data sets with new data"),
        count_cell(summary.data_sets.len(), Color::Green),
    ]);
    table.add_row(vec![Cell::new("Individuals"), Cell::new(summary.individuals)]);
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(summary.entities + summary.individuals).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn entity_columns(entity: &Entity) -> (String, Option<String>, Option<String>) {
    match entity {
        Entity::Folder(folder) => (
            folder.name.clone(),
            None,
            folder.parent.map(|parent| format!("parent {parent}")),
        ),
        Entity::DataSet(data_set) => (
            data_set.name.clone(),
            None,
            data_set.schema.as_deref().map(schema_text),
        ),
        Entity::Variable(variable) => {
            let mut details = variable.kind.to_string();
            if let Some(data_set) = variable.scoped_data_set {
                details.push_str(&format!(", data set {data_set}"));
            }
            (variable.name.clone(), Some(variable.key.clone()), Some(details))
        }
        Entity::Attribute(attribute) => (
            attribute.name.clone(),
            Some(attribute.key.clone()),
            Some(format!("variable {}", attribute.variable)),
        ),
        Entity::User(user) => (user.name.clone(), None, user.email.clone()),
        Entity::Publication(publication) => (
            publication.target.clone(),
            None,
            publication
                .created
                .map(|created| created.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ),
    }
}

fn schema_text(schema: &[SchemaEntry]) -> String {
    schema
        .iter()
        .map(|entry| {
            let attributes = entry.attribute_ids();
            if attributes.is_empty() {
                entry.variable.to_string()
            } else {
                let ids: Vec<String> = attributes.iter().map(ToString::to_string).collect();
                format!("{}[{}]", entry.variable, ids.join(","))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
