//! Spreadsheet renderers: the full workbook and the notes-only info sheet.

use std::io::Write;

use chrono::{Local, NaiveDate};
use tracing::warn;

use dex_model::{CanonicalTable, ColumnRole, OutputFormat};

use super::notes::notes_sheet;
use super::workbook::{Cell, MAX_DATA_ROWS, PivotTable, Sheet, Workbook};
use crate::error::RenderError;
use crate::projection::ROW_NUMBER_COLUMN;
use crate::renderer::Renderer;

pub const DATA_SHEET: &str = "Data";
pub const PIVOT_SHEET: &str = "Pivot";

/// Workbook with a `Notes` sheet, a `Pivot` sheet summarising measures by
/// dimension and the `Data` sheet the pivot reads from.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRenderer;

impl XlsxRenderer {
    /// Build the workbook without writing it.
    pub fn workbook(table: &CanonicalTable, built: NaiveDate) -> Workbook {
        if table.row_count() > MAX_DATA_ROWS {
            warn!(
                dataset = %table.name(),
                rows = table.row_count(),
                limit = MAX_DATA_ROWS,
                "dataset exceeds the worksheet row limit"
            );
        }
        let notes = notes_sheet(table, "Excel workbook", built);

        let mut data = Sheet::new(DATA_SHEET);
        data.freeze_header = true;
        data.auto_filter = true;
        data.push(
            table
                .columns()
                .iter()
                .map(|column| Cell::header(column.name.as_str()))
                .collect(),
        );
        for row in table.rows() {
            data.push(row.iter().map(Cell::from).collect());
        }

        match pivot_table(table) {
            Some(pivot) => {
                Workbook::new(vec![notes, Sheet::new(PIVOT_SHEET), data]).with_pivot(pivot)
            }
            None => Workbook::new(vec![notes, data]),
        }
    }
}

/// Sourced dimensions as rows, sourced measures as summed values.
fn pivot_table(table: &CanonicalTable) -> Option<PivotTable> {
    let mut row_fields = Vec::new();
    let mut data_fields = Vec::new();
    for (index, column) in table.columns().iter().enumerate() {
        if column.formula.is_some() || column.name == ROW_NUMBER_COLUMN {
            continue;
        }
        match column.role {
            ColumnRole::Dimension => row_fields.push(index),
            ColumnRole::Measure => data_fields.push(index),
        }
    }
    if row_fields.is_empty() && data_fields.is_empty() {
        return None;
    }
    Some(PivotTable {
        sheet: PIVOT_SHEET.to_string(),
        source: DATA_SHEET.to_string(),
        fields: table.columns().iter().map(|column| column.name.clone()).collect(),
        row_fields,
        data_fields,
    })
}

impl Renderer for XlsxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Xlsx
    }

    fn render(&self, table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError> {
        Self::workbook(table, Local::now().date_naive()).write(writer)
    }
}

/// Notes sheet only, to accompany a flat data file.
#[derive(Debug, Clone)]
pub struct InfoRenderer {
    data_format: String,
}

impl InfoRenderer {
    /// `data_format` names the file the notes accompany, e.g. `CSV`.
    pub fn new(data_format: impl Into<String>) -> Self {
        Self {
            data_format: data_format.into(),
        }
    }
}

impl Default for InfoRenderer {
    fn default() -> Self {
        Self::new("CSV")
    }
}

impl Renderer for InfoRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Info
    }

    fn render(&self, table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError> {
        let notes = notes_sheet(table, &self.data_format, Local::now().date_naive());
        Workbook::new(vec![notes]).write(writer)
    }
}
