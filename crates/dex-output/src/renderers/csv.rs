//! Flat CSV output.

use std::io::Write;

use dex_model::{CanonicalTable, OutputFormat};

use crate::error::RenderError;
use crate::renderer::Renderer;

/// Header row plus one record per row; nulls are empty fields.
///
/// Computed columns carry no data and are left out.
#[derive(Debug, Clone, Copy)]
pub struct CsvRenderer {
    delimiter: u8,
}

impl CsvRenderer {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvRenderer {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl Renderer for CsvRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn render(&self, table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError> {
        write_csv(table, writer, self.delimiter, &table.sourced_columns())
    }
}

/// Write the listed columns of `table`.
pub(crate) fn write_csv(
    table: &CanonicalTable,
    writer: &mut dyn Write,
    delimiter: u8,
    columns: &[usize],
) -> Result<(), RenderError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    let descriptors = table.columns();
    csv.write_record(columns.iter().map(|&i| descriptors[i].name.as_str()))?;
    for row in table.rows() {
        csv.write_record(columns.iter().map(|&i| row[i].to_string()))?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dex_model::{ColumnDescriptor, ColumnRole, DataType, DatasetIdentity, Value};

    #[test]
    fn renders_typed_values() {
        let columns = vec![
            ColumnDescriptor::new("Order Date", DataType::Date, ColumnRole::Dimension),
            ColumnDescriptor::new("Region", DataType::String, ColumnRole::Dimension),
            ColumnDescriptor::new("Sales", DataType::Double, ColumnRole::Measure),
            ColumnDescriptor {
                formula: Some("SUM([Sales])".into()),
                ..ColumnDescriptor::new("Total", DataType::Double, ColumnRole::Measure)
            },
        ];
        let mut table = CanonicalTable::new(DatasetIdentity::default(), columns);
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        table
            .push_row(vec![
                Value::Date(date),
                Value::Text("West, Coast".into()),
                Value::Double(10.0),
                Value::Null,
            ])
            .unwrap();
        table
            .push_row(vec![
                Value::Null,
                Value::Text("East".into()),
                Value::Double(0.25),
                Value::Null,
            ])
            .unwrap();

        let mut out = Vec::new();
        CsvRenderer::default().render(&table, &mut out).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
        Order Date,Region,Sales
        2024-02-29,"West, Coast",10
        ,East,0.25
        "#);
    }
}
