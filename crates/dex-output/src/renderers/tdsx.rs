//! Packaged BI datasource output.
//!
//! The package is a zip holding `<name>.tds`, an XML datasource definition,
//! and `Data/<name>.csv`, which the definition reaches through a text-file
//! connection.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use dex_model::{CanonicalTable, ColumnDescriptor, ColumnRole, DataType, OutputFormat};

use super::csv::write_csv;
use crate::builder::file_stem;
use crate::error::RenderError;
use crate::renderer::Renderer;
use crate::xml::{end, start, write_declaration, write_empty, write_text_element};

const DATA_DIRECTORY: &str = "Data";
const TDS_VERSION: &str = "18.1";

#[derive(Debug, Clone, Copy, Default)]
pub struct TdsxRenderer;

impl Renderer for TdsxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Tdsx
    }

    fn render(&self, table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError> {
        let stem = file_stem(table.name());
        let data_file = format!("{stem}.csv");

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(format!("{stem}.tds"), options)?;
        write_tds(&mut zip, table, &data_file)?;
        zip.start_file(format!("{DATA_DIRECTORY}/{data_file}"), options)?;
        write_csv(table, &mut zip, b',', &table.sourced_columns())?;

        let bytes = zip.finish()?.into_inner();
        writer.write_all(&bytes)?;
        Ok(())
    }
}

/// Write the datasource definition for `table`.
pub fn write_tds<W: Write>(out: W, table: &CanonicalTable, data_file: &str) -> Result<(), RenderError> {
    let mut xml = Writer::new_with_indent(out, b' ', 2);
    write_declaration(&mut xml)?;
    let caption = if table.identity().collection.is_empty() {
        table.name().to_string()
    } else {
        format!("{} ({})", table.name(), table.identity().collection)
    };
    start(
        &mut xml,
        "datasource",
        &[
            ("formatted-name", caption.as_str()),
            ("inline", "true"),
            ("version", TDS_VERSION),
        ],
    )?;

    start(
        &mut xml,
        "connection",
        &[
            ("class", "textscan"),
            ("directory", DATA_DIRECTORY),
            ("filename", data_file),
            ("separator", ","),
            ("charset", "UTF-8"),
            ("header", "yes"),
        ],
    )?;
    let relation_table = format!("[{}]", data_file.replace('.', "#"));
    write_empty(
        &mut xml,
        "relation",
        &[
            ("name", data_file),
            ("table", relation_table.as_str()),
            ("type", "table"),
        ],
    )?;
    end(&mut xml, "connection")?;
    write_empty(&mut xml, "aliases", &[("enabled", "yes")])?;

    for column in table.columns() {
        write_column(&mut xml, column)?;
    }
    write_drill_paths(&mut xml, table)?;
    write_folders(&mut xml, table)?;
    end(&mut xml, "datasource")
}

fn write_column<W: Write>(xml: &mut Writer<W>, column: &ColumnDescriptor) -> Result<(), RenderError> {
    let name = field_reference(&column.name);
    let mut attributes = vec![
        ("caption", column.name.as_str()),
        ("datatype", tableau_datatype(column.datatype)),
        ("name", name.as_str()),
        ("role", column.role.as_str()),
        ("type", field_type(column)),
    ];
    if let Some(format) = &column.format_hint {
        attributes.push(("default-format", format.as_str()));
    }
    if column.description.is_empty() && column.formula.is_none() {
        return write_empty(xml, "column", &attributes);
    }

    start(xml, "column", &attributes)?;
    if let Some(formula) = &column.formula {
        write_empty(xml, "calculation", &[("class", "tableau"), ("formula", formula.as_str())])?;
    }
    if !column.description.is_empty() {
        start(xml, "desc", &[])?;
        start(xml, "formatted-text", &[])?;
        write_text_element(xml, "run", &column.description)?;
        end(xml, "formatted-text")?;
        end(xml, "desc")?;
    }
    end(xml, "column")
}

fn write_drill_paths<W: Write>(xml: &mut Writer<W>, table: &CanonicalTable) -> Result<(), RenderError> {
    let names = table.hierarchy_names();
    if names.is_empty() {
        return Ok(());
    }
    start(xml, "drill-paths", &[])?;
    for name in names {
        start(xml, "drill-path", &[("name", name)])?;
        for column in table.hierarchy(name) {
            write_text_element(xml, "field", &field_reference(&column.name))?;
        }
        end(xml, "drill-path")?;
    }
    end(xml, "drill-paths")
}

fn write_folders<W: Write>(xml: &mut Writer<W>, table: &CanonicalTable) -> Result<(), RenderError> {
    let mut folders: BTreeMap<&str, Vec<&ColumnDescriptor>> = BTreeMap::new();
    for column in table.columns() {
        for group in &column.groups {
            folders.entry(group.as_str()).or_default().push(column);
        }
    }
    for (name, columns) in folders {
        let role = if columns.iter().all(|c| c.role == ColumnRole::Measure) {
            "measures"
        } else {
            "dimensions"
        };
        start(xml, "folder", &[("name", name), ("role", role)])?;
        for column in columns {
            let item = field_reference(&column.name);
            write_empty(xml, "folder-item", &[("name", item.as_str()), ("type", "field")])?;
        }
        end(xml, "folder")?;
    }
    Ok(())
}

fn field_reference(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn tableau_datatype(datatype: DataType) -> &'static str {
    match datatype {
        DataType::String => "string",
        DataType::Integer => "integer",
        DataType::Double => "real",
        DataType::Boolean => "boolean",
        DataType::Date => "date",
        DataType::DateTime => "datetime",
    }
}

fn field_type(column: &ColumnDescriptor) -> &'static str {
    match (column.role, column.datatype) {
        (ColumnRole::Measure, _) => "quantitative",
        (ColumnRole::Dimension, DataType::Date | DataType::DateTime) => "ordinal",
        (ColumnRole::Dimension, _) => "nominal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_model::{DatasetIdentity, HierarchyPosition, Value};
    use std::io::Read;

    fn table() -> CanonicalTable {
        let mut country = ColumnDescriptor::new("Country", DataType::String, ColumnRole::Dimension);
        country.groups.push("Location".into());
        country.hierarchies.push(HierarchyPosition {
            hierarchy: "Geography".into(),
            level: 1,
        });
        let mut city = ColumnDescriptor::new("City", DataType::String, ColumnRole::Dimension);
        city.description = "Town or city".into();
        city.hierarchies.push(HierarchyPosition {
            hierarchy: "Geography".into(),
            level: 2,
        });
        let mut sales = ColumnDescriptor::new("Sales", DataType::Double, ColumnRole::Measure);
        sales.format_hint = Some("C2".into());
        let mut ratio = ColumnDescriptor::new("Ratio", DataType::Double, ColumnRole::Measure);
        ratio.formula = Some("[Sales]/100".into());

        let identity = DatasetIdentity {
            name: "city sales".into(),
            collection: "ENQ-1".into(),
            ..DatasetIdentity::default()
        };
        let mut table = CanonicalTable::new(identity, vec![country, city, sales, ratio]);
        table
            .push_row(vec![
                Value::Text("UK".into()),
                Value::Text("Leeds".into()),
                Value::Double(5.0),
                Value::Null,
            ])
            .unwrap();
        table
    }

    #[test]
    fn definition_describes_fields() {
        let mut out = Vec::new();
        write_tds(&mut out, &table(), "city sales.csv").unwrap();
        let tds = String::from_utf8(out).unwrap();

        assert!(tds.contains(r#"formatted-name="city sales (ENQ-1)""#));
        assert!(tds.contains(r#"filename="city sales.csv""#));
        assert!(tds.contains(
            r#"<column caption="Sales" datatype="real" name="[Sales]" role="measure" type="quantitative" default-format="C2"/>"#
        ));
        assert!(tds.contains(r#"<calculation class="tableau" formula="[Sales]/100"/>"#));
        assert!(tds.contains("<run>Town or city</run>"));
        assert!(tds.contains(r#"<drill-path name="Geography">"#));
        assert!(tds.find("<field>[Country]</field>") < tds.find("<field>[City]</field>"));
        assert!(tds.contains(r#"<folder name="Location" role="dimensions">"#));
    }

    #[test]
    fn package_holds_definition_and_data() {
        let mut out = Vec::new();
        TdsxRenderer.render(&table(), &mut out).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(out)).unwrap();
        assert!(archive.by_name("city sales.tds").is_ok());
        let mut data = String::new();
        archive
            .by_name("Data/city sales.csv")
            .unwrap()
            .read_to_string(&mut data)
            .unwrap();
        assert_eq!(data, "Country,City,Sales\nUK,Leeds,5\n");
    }
}
