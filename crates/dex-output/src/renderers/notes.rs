//! The `Notes` worksheet describing a dataset.

use chrono::NaiveDate;

use dex_model::{CanonicalTable, ColumnDescriptor};

use super::workbook::{Cell, Sheet};

pub const NOTES_SHEET: &str = "Notes";

const ROWS_LABEL: &str = "Rows";

const FIELD_HEADERS: [&str; 8] = [
    "Field",
    "Type",
    "Role",
    "Description",
    "Format",
    "Formula",
    "Groups",
    "Hierarchies",
];

/// Dataset identity, size, build date and field definitions.
pub fn notes_sheet(table: &CanonicalTable, data_format: &str, built: NaiveDate) -> Sheet {
    let identity = table.identity();
    let mut sheet = Sheet::new(NOTES_SHEET);
    sheet.push(vec![Cell::header("Dataset"), Cell::text(&identity.name)]);
    if !identity.collection.is_empty() {
        sheet.push(vec![Cell::header("Collection"), Cell::text(&identity.collection)]);
    }
    for (key, value) in &identity.properties {
        sheet.push(vec![Cell::header(key), Cell::text(value)]);
    }
    sheet.push(vec![Cell::header(ROWS_LABEL), row_count(table.row_count())]);
    sheet.push(vec![Cell::header("Built"), Cell::Date(built)]);
    sheet.push(vec![Cell::header("Format"), Cell::text(data_format)]);
    sheet.push(Vec::new());

    sheet.push(FIELD_HEADERS.iter().map(|h| Cell::header(*h)).collect());
    for column in table.columns() {
        sheet.push(field_row(column));
    }
    sheet
}

/// Point the `Rows` entry of a notes sheet at a new count, e.g. after the
/// data sheet was partitioned.
pub fn set_row_count(sheet: &mut Sheet, rows: usize) {
    let entry = sheet.rows.iter_mut().find(|row| {
        matches!(row.as_slice(), [Cell::Header(label), Cell::Integer(_), ..] if label == ROWS_LABEL)
    });
    if let Some(row) = entry {
        row[1] = row_count(rows);
    }
}

fn row_count(rows: usize) -> Cell {
    Cell::Integer(i64::try_from(rows).unwrap_or(i64::MAX))
}

fn field_row(column: &ColumnDescriptor) -> Vec<Cell> {
    let hierarchies = column
        .hierarchies
        .iter()
        .map(|position| format!("{} ({})", position.hierarchy, position.level))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        Cell::text(&column.name),
        Cell::text(column.datatype.as_str()),
        Cell::text(column.role.as_str()),
        Cell::text(&column.description),
        Cell::text(column.format_hint.as_deref().unwrap_or_default()),
        Cell::text(column.formula.as_deref().unwrap_or_default()),
        Cell::text(column.groups.join(", ")),
        Cell::text(hierarchies),
    ]
}
