//! Minimal Office Open XML workbook writer.
//!
//! Cells are written inline (no shared string table). Dates are stored as
//! serial numbers with a date number format, the way spreadsheet tools
//! expect them. A workbook may carry one pivot table; its cache holds no
//! records and is rebuilt from the source range when the file is opened.

use std::fmt;
use std::io::{Cursor, Write};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use dex_model::Value;

use crate::error::RenderError;
use crate::xml::{end, start, write_declaration, write_empty};

/// Rows a worksheet can hold below its header.
pub const MAX_DATA_ROWS: usize = 1_048_575;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const WORKSHEET_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const STYLES_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const OFFICE_DOCUMENT_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(super) const PIVOT_TABLE_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotTable";
pub(super) const PIVOT_CACHE_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotCacheDefinition";

pub(super) const PIVOT_TABLE_PART: &str = "xl/pivotTables/pivotTable1.xml";
pub(super) const PIVOT_CACHE_PART: &str = "xl/pivotCache/pivotCacheDefinition1.xml";

/// Days between 0001-01-01 and the spreadsheet epoch, 1899-12-30.
pub(super) const EPOCH_DAYS_FROM_CE: i32 = 693_594;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="2"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/><numFmt numFmtId="165" formatCode="yyyy-mm-dd hh:mm:ss"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

pub(super) const STYLE_HEADER: &str = "1";
pub(super) const STYLE_DATE: &str = "2";
pub(super) const STYLE_DATETIME: &str = "3";

/// One worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Header(String),
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Cell::Text(text.into())
    }

    pub fn header(text: impl Into<String>) -> Self {
        Cell::Header(text.into())
    }
}

/// Text as the matching [`Value`] would display it.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Header(text) | Cell::Text(text) => f.write_str(text),
            Cell::Integer(value) => write!(f, "{value}"),
            Cell::Number(value) => write!(f, "{}", Value::Double(*value)),
            Cell::Boolean(value) => write!(f, "{value}"),
            Cell::Date(date) => write!(f, "{}", Value::Date(*date)),
            Cell::DateTime(datetime) => write!(f, "{}", Value::DateTime(*datetime)),
        }
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Text(text) => Cell::Text(text.clone()),
            Value::Integer(value) => Cell::Integer(*value),
            Value::Double(value) => Cell::Number(*value),
            Value::Boolean(value) => Cell::Boolean(*value),
            Value::Date(date) => Cell::Date(*date),
            Value::DateTime(datetime) => Cell::DateTime(*datetime),
        }
    }
}

/// A named worksheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    /// Keep the first row visible while scrolling.
    pub freeze_header: bool,
    /// Put a filter on the header row.
    pub auto_filter: bool,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Range covered by the sheet, e.g. `A1:D10`.
    pub fn dimension(&self) -> String {
        let width = self.width().max(1);
        let height = self.rows.len().max(1);
        format!("A1:{}", cell_reference(width - 1, height - 1))
    }
}

/// A pivot table over the whole used range of a source sheet.
///
/// Field indices refer to the header row of the source sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    /// Sheet the table is placed on.
    pub sheet: String,
    /// Sheet holding the data, header row first.
    pub source: String,
    /// Source header names in column order.
    pub fields: Vec<String>,
    /// Fields laid out down the rows.
    pub row_fields: Vec<usize>,
    /// Fields summed in the values area.
    pub data_fields: Vec<usize>,
}

impl PivotTable {
    fn axis(&self, field: usize) -> Option<&'static str> {
        self.row_fields.contains(&field).then_some("axisRow")
    }
}

/// An ordered set of worksheets.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub pivot: Option<PivotTable>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self {
            sheets,
            pivot: None,
        }
    }

    #[must_use]
    pub fn with_pivot(mut self, pivot: PivotTable) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    fn position(&self, name: &str) -> Result<usize, RenderError> {
        self.sheets
            .iter()
            .position(|sheet| sheet.name == name)
            .ok_or_else(|| RenderError::Message(format!("workbook has no sheet named '{name}'")))
    }

    /// Write the workbook package to `writer`.
    pub fn write(&self, writer: &mut dyn Write) -> Result<(), RenderError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Zero-based index of the pivot sheet and the source range.
        let pivot = match &self.pivot {
            Some(pivot) => {
                let sheet = self.position(&pivot.sheet)?;
                let source = &self.sheets[self.position(&pivot.source)?];
                Some((pivot, sheet, source.dimension()))
            }
            None => None,
        };

        zip.start_file("[Content_Types].xml", options)?;
        self.write_content_types(&mut zip)?;
        zip.start_file("_rels/.rels", options)?;
        write_package_rels(&mut zip)?;
        zip.start_file("xl/workbook.xml", options)?;
        self.write_workbook(&mut zip)?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        self.write_workbook_rels(&mut zip)?;
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES.as_bytes())?;
        for (index, sheet) in self.sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
            write_sheet(&mut zip, sheet)?;
        }

        if let Some((pivot, sheet, range)) = pivot {
            zip.start_file(format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet + 1), options)?;
            write_single_rel(&mut zip, PIVOT_TABLE_TYPE, "../pivotTables/pivotTable1.xml")?;
            zip.start_file(PIVOT_TABLE_PART, options)?;
            write_pivot_table(&mut zip, pivot)?;
            zip.start_file("xl/pivotTables/_rels/pivotTable1.xml.rels", options)?;
            write_single_rel(&mut zip, PIVOT_CACHE_TYPE, "../pivotCache/pivotCacheDefinition1.xml")?;
            zip.start_file(PIVOT_CACHE_PART, options)?;
            write_pivot_cache(&mut zip, pivot, &range)?;
        }

        let bytes = zip.finish()?.into_inner();
        writer.write_all(&bytes)?;
        Ok(())
    }

    fn write_content_types<W: Write>(&self, out: W) -> Result<(), RenderError> {
        let mut xml = Writer::new(out);
        write_declaration(&mut xml)?;
        start(&mut xml, "Types", &[("xmlns", CONTENT_TYPES_NS)])?;
        write_empty(
            &mut xml,
            "Default",
            &[
                ("Extension", "rels"),
                ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
            ],
        )?;
        write_empty(
            &mut xml,
            "Default",
            &[("Extension", "xml"), ("ContentType", "application/xml")],
        )?;
        write_empty(
            &mut xml,
            "Override",
            &[
                ("PartName", "/xl/workbook.xml"),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
                ),
            ],
        )?;
        write_empty(
            &mut xml,
            "Override",
            &[
                ("PartName", "/xl/styles.xml"),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
                ),
            ],
        )?;
        for index in 1..=self.sheets.len() {
            let part = format!("/xl/worksheets/sheet{index}.xml");
            write_empty(
                &mut xml,
                "Override",
                &[
                    ("PartName", part.as_str()),
                    (
                        "ContentType",
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                    ),
                ],
            )?;
        }
        if self.pivot.is_some() {
            write_empty(
                &mut xml,
                "Override",
                &[
                    ("PartName", "/xl/pivotTables/pivotTable1.xml"),
                    (
                        "ContentType",
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.pivotTable+xml",
                    ),
                ],
            )?;
            write_empty(
                &mut xml,
                "Override",
                &[
                    ("PartName", "/xl/pivotCache/pivotCacheDefinition1.xml"),
                    (
                        "ContentType",
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.pivotCacheDefinition+xml",
                    ),
                ],
            )?;
        }
        end(&mut xml, "Types")
    }

    fn write_workbook<W: Write>(&self, out: W) -> Result<(), RenderError> {
        let mut xml = Writer::new(out);
        write_declaration(&mut xml)?;
        start(
            &mut xml,
            "workbook",
            &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)],
        )?;
        start(&mut xml, "sheets", &[])?;
        for (index, sheet) in self.sheets.iter().enumerate() {
            let sheet_id = (index + 1).to_string();
            let rel_id = format!("rId{}", index + 1);
            write_empty(
                &mut xml,
                "sheet",
                &[
                    ("name", sheet.name.as_str()),
                    ("sheetId", sheet_id.as_str()),
                    ("r:id", rel_id.as_str()),
                ],
            )?;
        }
        end(&mut xml, "sheets")?;

        let filters: Vec<(usize, &Sheet)> = self
            .sheets
            .iter()
            .enumerate()
            .filter(|(_, sheet)| sheet.auto_filter)
            .collect();
        if !filters.is_empty() {
            start(&mut xml, "definedNames", &[])?;
            for (index, sheet) in filters {
                let local = index.to_string();
                start(
                    &mut xml,
                    "definedName",
                    &[
                        ("name", "_xlnm._FilterDatabase"),
                        ("localSheetId", local.as_str()),
                        ("hidden", "1"),
                    ],
                )?;
                let target = format!("'{}'!{}", sheet.name.replace('\'', "''"), absolute(&sheet.dimension()));
                xml.write_event(Event::Text(BytesText::new(&target)))?;
                end(&mut xml, "definedName")?;
            }
            end(&mut xml, "definedNames")?;
        }
        if self.pivot.is_some() {
            let rel_id = self.pivot_cache_rel_id();
            start(&mut xml, "pivotCaches", &[])?;
            write_empty(
                &mut xml,
                "pivotCache",
                &[("cacheId", "1"), ("r:id", rel_id.as_str())],
            )?;
            end(&mut xml, "pivotCaches")?;
        }
        end(&mut xml, "workbook")
    }

    /// Styles take the id after the sheets; the pivot cache the next one.
    fn pivot_cache_rel_id(&self) -> String {
        format!("rId{}", self.sheets.len() + 2)
    }

    fn write_workbook_rels<W: Write>(&self, out: W) -> Result<(), RenderError> {
        let mut xml = Writer::new(out);
        write_declaration(&mut xml)?;
        start(&mut xml, "Relationships", &[("xmlns", PACKAGE_REL_NS)])?;
        for index in 1..=self.sheets.len() {
            let id = format!("rId{index}");
            let target = format!("worksheets/sheet{index}.xml");
            write_empty(
                &mut xml,
                "Relationship",
                &[
                    ("Id", id.as_str()),
                    ("Type", WORKSHEET_TYPE),
                    ("Target", target.as_str()),
                ],
            )?;
        }
        let styles_id = format!("rId{}", self.sheets.len() + 1);
        write_empty(
            &mut xml,
            "Relationship",
            &[
                ("Id", styles_id.as_str()),
                ("Type", STYLES_TYPE),
                ("Target", "styles.xml"),
            ],
        )?;
        if self.pivot.is_some() {
            let cache_id = self.pivot_cache_rel_id();
            write_empty(
                &mut xml,
                "Relationship",
                &[
                    ("Id", cache_id.as_str()),
                    ("Type", PIVOT_CACHE_TYPE),
                    ("Target", "pivotCache/pivotCacheDefinition1.xml"),
                ],
            )?;
        }
        end(&mut xml, "Relationships")
    }
}

fn write_single_rel<W: Write>(out: W, kind: &str, target: &str) -> Result<(), RenderError> {
    let mut xml = Writer::new(out);
    write_declaration(&mut xml)?;
    start(&mut xml, "Relationships", &[("xmlns", PACKAGE_REL_NS)])?;
    write_empty(
        &mut xml,
        "Relationship",
        &[("Id", "rId1"), ("Type", kind), ("Target", target)],
    )?;
    end(&mut xml, "Relationships")
}

fn write_pivot_cache<W: Write>(out: W, pivot: &PivotTable, range: &str) -> Result<(), RenderError> {
    let mut xml = Writer::new(out);
    write_declaration(&mut xml)?;
    start(
        &mut xml,
        "pivotCacheDefinition",
        &[
            ("xmlns", MAIN_NS),
            ("xmlns:r", REL_NS),
            ("refreshOnLoad", "1"),
            ("saveData", "0"),
            ("recordCount", "0"),
            ("createdVersion", "3"),
            ("refreshedVersion", "3"),
            ("minRefreshableVersion", "3"),
        ],
    )?;
    start(&mut xml, "cacheSource", &[("type", "worksheet")])?;
    write_empty(
        &mut xml,
        "worksheetSource",
        &[("ref", range), ("sheet", pivot.source.as_str())],
    )?;
    end(&mut xml, "cacheSource")?;

    let count = pivot.fields.len().to_string();
    start(&mut xml, "cacheFields", &[("count", count.as_str())])?;
    for (index, field) in pivot.fields.iter().enumerate() {
        start(
            &mut xml,
            "cacheField",
            &[("name", field.as_str()), ("numFmtId", "0")],
        )?;
        if pivot.data_fields.contains(&index) {
            write_empty(
                &mut xml,
                "sharedItems",
                &[
                    ("containsSemiMixedTypes", "0"),
                    ("containsString", "0"),
                    ("containsNumber", "1"),
                ],
            )?;
        } else {
            write_empty(&mut xml, "sharedItems", &[])?;
        }
        end(&mut xml, "cacheField")?;
    }
    end(&mut xml, "cacheFields")?;
    end(&mut xml, "pivotCacheDefinition")
}

fn write_pivot_table<W: Write>(out: W, pivot: &PivotTable) -> Result<(), RenderError> {
    let mut xml = Writer::new(out);
    write_declaration(&mut xml)?;
    start(
        &mut xml,
        "pivotTableDefinition",
        &[
            ("xmlns", MAIN_NS),
            ("name", "PivotTable1"),
            ("cacheId", "1"),
            ("dataCaption", "Values"),
            ("applyNumberFormats", "0"),
            ("applyBorderFormats", "0"),
            ("applyFontFormats", "0"),
            ("applyPatternFormats", "0"),
            ("applyAlignmentFormats", "0"),
            ("applyWidthHeightFormats", "1"),
            ("updatedVersion", "3"),
            ("minRefreshableVersion", "3"),
            ("createdVersion", "3"),
            ("useAutoFormatting", "1"),
            ("outline", "1"),
            ("outlineData", "1"),
        ],
    )?;
    write_empty(
        &mut xml,
        "location",
        &[
            ("ref", "A3"),
            ("firstHeaderRow", "1"),
            ("firstDataRow", "1"),
            ("firstDataCol", "1"),
        ],
    )?;

    let count = pivot.fields.len().to_string();
    start(&mut xml, "pivotFields", &[("count", count.as_str())])?;
    for index in 0..pivot.fields.len() {
        if let Some(axis) = pivot.axis(index) {
            start(&mut xml, "pivotField", &[("axis", axis), ("showAll", "0")])?;
            start(&mut xml, "items", &[("count", "1")])?;
            write_empty(&mut xml, "item", &[("t", "default")])?;
            end(&mut xml, "items")?;
            end(&mut xml, "pivotField")?;
        } else if pivot.data_fields.contains(&index) {
            write_empty(&mut xml, "pivotField", &[("dataField", "1"), ("showAll", "0")])?;
        } else {
            write_empty(&mut xml, "pivotField", &[("showAll", "0")])?;
        }
    }
    end(&mut xml, "pivotFields")?;

    if !pivot.row_fields.is_empty() {
        let count = pivot.row_fields.len().to_string();
        start(&mut xml, "rowFields", &[("count", count.as_str())])?;
        for field in &pivot.row_fields {
            let x = field.to_string();
            write_empty(&mut xml, "field", &[("x", x.as_str())])?;
        }
        end(&mut xml, "rowFields")?;
    }
    // Several value fields are laid out across the columns.
    if pivot.data_fields.len() > 1 {
        start(&mut xml, "colFields", &[("count", "1")])?;
        write_empty(&mut xml, "field", &[("x", "-2")])?;
        end(&mut xml, "colFields")?;
    }
    if !pivot.data_fields.is_empty() {
        let count = pivot.data_fields.len().to_string();
        start(&mut xml, "dataFields", &[("count", count.as_str())])?;
        for &field in &pivot.data_fields {
            let name = format!(
                "Sum of {}",
                pivot.fields.get(field).map_or("", String::as_str)
            );
            let fld = field.to_string();
            write_empty(
                &mut xml,
                "dataField",
                &[
                    ("name", name.as_str()),
                    ("fld", fld.as_str()),
                    ("baseField", "0"),
                    ("baseItem", "0"),
                ],
            )?;
        }
        end(&mut xml, "dataFields")?;
    }
    write_empty(
        &mut xml,
        "pivotTableStyleInfo",
        &[
            ("name", "PivotStyleLight16"),
            ("showRowHeaders", "1"),
            ("showColHeaders", "1"),
            ("showRowStripes", "0"),
            ("showColStripes", "0"),
            ("showLastColumn", "1"),
        ],
    )?;
    end(&mut xml, "pivotTableDefinition")
}

fn write_package_rels<W: Write>(out: W) -> Result<(), RenderError> {
    let mut xml = Writer::new(out);
    write_declaration(&mut xml)?;
    start(&mut xml, "Relationships", &[("xmlns", PACKAGE_REL_NS)])?;
    write_empty(
        &mut xml,
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", OFFICE_DOCUMENT_TYPE),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    end(&mut xml, "Relationships")
}

fn write_sheet<W: Write>(out: W, sheet: &Sheet) -> Result<(), RenderError> {
    let mut xml = Writer::new(out);
    write_declaration(&mut xml)?;
    start(
        &mut xml,
        "worksheet",
        &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)],
    )?;
    let dimension = sheet.dimension();
    write_empty(&mut xml, "dimension", &[("ref", dimension.as_str())])?;

    if sheet.freeze_header {
        start(&mut xml, "sheetViews", &[])?;
        start(&mut xml, "sheetView", &[("workbookViewId", "0")])?;
        write_empty(
            &mut xml,
            "pane",
            &[
                ("ySplit", "1"),
                ("topLeftCell", "A2"),
                ("activePane", "bottomLeft"),
                ("state", "frozen"),
            ],
        )?;
        end(&mut xml, "sheetView")?;
        end(&mut xml, "sheetViews")?;
    }

    start(&mut xml, "sheetData", &[])?;
    for (row_index, row) in sheet.rows.iter().enumerate() {
        let row_number = (row_index + 1).to_string();
        start(&mut xml, "row", &[("r", row_number.as_str())])?;
        for (column_index, cell) in row.iter().enumerate() {
            write_cell(&mut xml, &cell_reference(column_index, row_index), cell)?;
        }
        end(&mut xml, "row")?;
    }
    end(&mut xml, "sheetData")?;

    if sheet.auto_filter && !sheet.rows.is_empty() {
        write_empty(&mut xml, "autoFilter", &[("ref", dimension.as_str())])?;
    }
    end(&mut xml, "worksheet")
}

fn write_cell<W: Write>(xml: &mut Writer<W>, reference: &str, cell: &Cell) -> Result<(), RenderError> {
    match cell {
        Cell::Empty => Ok(()),
        Cell::Header(text) => write_inline(xml, reference, text, Some(STYLE_HEADER)),
        Cell::Text(text) => write_inline(xml, reference, text, None),
        Cell::Integer(value) => write_value(xml, reference, &value.to_string(), None, None),
        Cell::Number(value) if value.is_finite() => {
            write_value(xml, reference, &value.to_string(), None, None)
        }
        Cell::Number(value) => write_inline(xml, reference, &value.to_string(), None),
        Cell::Boolean(value) => {
            write_value(xml, reference, if *value { "1" } else { "0" }, Some("b"), None)
        }
        Cell::Date(date) => write_value(
            xml,
            reference,
            &date_serial(*date).to_string(),
            None,
            Some(STYLE_DATE),
        ),
        Cell::DateTime(datetime) => write_value(
            xml,
            reference,
            &datetime_serial(*datetime).to_string(),
            None,
            Some(STYLE_DATETIME),
        ),
    }
}

fn write_inline<W: Write>(
    xml: &mut Writer<W>,
    reference: &str,
    text: &str,
    style: Option<&str>,
) -> Result<(), RenderError> {
    let mut attributes = vec![("r", reference), ("t", "inlineStr")];
    if let Some(style) = style {
        attributes.push(("s", style));
    }
    start(xml, "c", &attributes)?;
    start(xml, "is", &[])?;
    let preserve = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    if preserve {
        start(xml, "t", &[("xml:space", "preserve")])?;
    } else {
        start(xml, "t", &[])?;
    }
    xml.write_event(Event::Text(BytesText::new(text)))?;
    end(xml, "t")?;
    end(xml, "is")?;
    end(xml, "c")
}

fn write_value<W: Write>(
    xml: &mut Writer<W>,
    reference: &str,
    value: &str,
    kind: Option<&str>,
    style: Option<&str>,
) -> Result<(), RenderError> {
    let mut attributes = vec![("r", reference)];
    if let Some(kind) = kind {
        attributes.push(("t", kind));
    }
    if let Some(style) = style {
        attributes.push(("s", style));
    }
    start(xml, "c", &attributes)?;
    start(xml, "v", &[])?;
    xml.write_event(Event::Text(BytesText::new(value)))?;
    end(xml, "v")?;
    end(xml, "c")
}

/// Column letters for a zero-based index: 0 is `A`, 26 is `AA`.
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

pub(super) fn cell_reference(column: usize, row: usize) -> String {
    format!("{}{}", column_letters(column), row + 1)
}

/// `A1:D10` as `$A$1:$D$10`.
fn absolute(range: &str) -> String {
    range
        .split(':')
        .map(|cell| {
            let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
            format!("${}${}", &cell[..split], &cell[split..])
        })
        .collect::<Vec<_>>()
        .join(":")
}

pub(super) fn date_serial(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
}

pub(super) fn datetime_serial(datetime: NaiveDateTime) -> f64 {
    let seconds = f64::from(datetime.time().num_seconds_from_midnight());
    date_serial(datetime.date()) as f64 + seconds / 86_400.0
}
