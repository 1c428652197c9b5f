//! JSON records output.

use std::io::Write;

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};

use dex_model::{CanonicalTable, ColumnDescriptor, OutputFormat, Value};

use crate::error::RenderError;
use crate::renderer::Renderer;

/// An array with one object per row, keys in column order.
///
/// Computed columns carry no data and are left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Renderer for JsonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError> {
        let records = Records {
            table,
            columns: table.sourced_columns(),
        };
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &records)?;
        } else {
            serde_json::to_writer(&mut *writer, &records)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

struct Records<'a> {
    table: &'a CanonicalTable,
    columns: Vec<usize>,
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.table.row_count()))?;
        for values in self.table.rows() {
            seq.serialize_element(&Record {
                descriptors: self.table.columns(),
                columns: &self.columns,
                values,
            })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    descriptors: &'a [ColumnDescriptor],
    columns: &'a [usize],
    values: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for &index in self.columns {
            map.serialize_entry(&self.descriptors[index].name, &self.values[index])?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_model::{ColumnRole, DataType, DatasetIdentity};

    #[test]
    fn keys_keep_column_order() {
        let columns = vec![
            ColumnDescriptor::new("Year", DataType::Integer, ColumnRole::Dimension),
            ColumnDescriptor::new("Active", DataType::Boolean, ColumnRole::Dimension),
            ColumnDescriptor::new("Amount", DataType::Double, ColumnRole::Measure),
        ];
        let mut table = CanonicalTable::new(DatasetIdentity::default(), columns);
        table
            .push_row(vec![Value::Integer(2024), Value::Boolean(true), Value::Double(1.5)])
            .unwrap();
        table
            .push_row(vec![Value::Integer(2023), Value::Null, Value::Text("n/a".into())])
            .unwrap();

        let mut out = Vec::new();
        JsonRenderer::default().render(&table, &mut out).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"[{"Year":2024,"Active":true,"Amount":1.5},{"Year":2023,"Active":null,"Amount":"n/a"}]"#);
    }
}
