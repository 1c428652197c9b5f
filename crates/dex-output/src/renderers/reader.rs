//! Reading back workbooks written by [`Workbook::write`].

use std::collections::HashMap;
use std::io::{Read, Seek};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use super::workbook::{
    Cell, EPOCH_DAYS_FROM_CE, PIVOT_CACHE_TYPE, PIVOT_TABLE_TYPE, PivotTable, STYLE_DATE,
    STYLE_DATETIME, STYLE_HEADER, Sheet, Workbook,
};
use crate::error::RenderError;

type Attributes = HashMap<String, String>;

impl Workbook {
    /// Read a workbook package.
    ///
    /// Only the cell forms the writer produces are understood: inline
    /// strings, numbers, booleans and the two date styles. Shared strings
    /// are rejected.
    pub fn read<R: Read + Seek>(source: R) -> Result<Workbook, RenderError> {
        let mut archive = ZipArchive::new(source)?;
        let book = read_part(&mut archive, "xl/workbook.xml")?;
        let rels = relationships(&read_part(&mut archive, "xl/_rels/workbook.xml.rels")?)?;

        let mut entries = Vec::new();
        each_element(&book, |name, attributes| {
            if name == "sheet" {
                entries.push((attribute(attributes, "name")?, attribute(attributes, "r:id")?));
            }
            Ok(())
        })?;

        let mut sheets = Vec::new();
        let mut pivot_part = None;
        for (name, rel_id) in entries {
            let (_, target) = rels.get(&rel_id).ok_or_else(|| {
                RenderError::Message(format!("sheet '{name}' has no relationship '{rel_id}'"))
            })?;
            let part = resolve("xl/workbook.xml", target);
            sheets.push(parse_sheet(name.clone(), &read_part(&mut archive, &part)?)?);

            if let Some(sheet_rels) = read_optional(&mut archive, &rels_path(&part))? {
                for (kind, target) in relationships(&sheet_rels)?.into_values() {
                    if kind == PIVOT_TABLE_TYPE {
                        pivot_part = Some((name.clone(), resolve(&part, &target)));
                    }
                }
            }
        }

        let pivot = match pivot_part {
            Some((sheet, part)) => Some(read_pivot(&mut archive, sheet, &part)?),
            None => None,
        };
        Ok(Workbook { sheets, pivot })
    }
}

fn read_pivot<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet: String,
    part: &str,
) -> Result<PivotTable, RenderError> {
    let mut row_fields = Vec::new();
    let mut data_fields = Vec::new();
    let mut in_rows = false;
    let table = read_part(archive, part)?;
    each_element(&table, |name, attributes| {
        match name {
            "rowFields" => in_rows = true,
            "colFields" | "dataFields" => in_rows = false,
            "field" if in_rows => row_fields.push(index(attributes, "x")?),
            "dataField" => data_fields.push(index(attributes, "fld")?),
            _ => {}
        }
        Ok(())
    })?;

    let cache_part = relationships(&read_part(archive, &rels_path(part))?)?
        .into_values()
        .find(|(kind, _)| kind == PIVOT_CACHE_TYPE)
        .map(|(_, target)| resolve(part, &target))
        .ok_or_else(|| RenderError::Message(format!("pivot table {part} has no cache")))?;

    let mut source = String::new();
    let mut fields = Vec::new();
    each_element(&read_part(archive, &cache_part)?, |name, attributes| {
        match name {
            "worksheetSource" => source = attribute(attributes, "sheet")?,
            "cacheField" => fields.push(attribute(attributes, "name")?),
            _ => {}
        }
        Ok(())
    })?;

    Ok(PivotTable {
        sheet,
        source,
        fields,
        row_fields,
        data_fields,
    })
}

/// A `<c>` element being read.
struct PendingCell {
    column: usize,
    kind: Option<String>,
    style: Option<String>,
    text: String,
}

impl PendingCell {
    fn finish(self) -> Result<Cell, RenderError> {
        let PendingCell {
            column,
            kind,
            style,
            text,
        } = self;
        match (kind.as_deref(), style.as_deref()) {
            (Some("inlineStr"), Some(STYLE_HEADER)) => Ok(Cell::Header(text)),
            (Some("inlineStr" | "str"), _) => Ok(Cell::Text(text)),
            (Some("b"), _) => Ok(Cell::Boolean(text == "1")),
            (Some("s"), _) => Err(RenderError::Message(
                "workbooks with shared strings are not supported".to_string(),
            )),
            _ if text.is_empty() => Ok(Cell::Empty),
            (_, Some(STYLE_DATE)) => text
                .parse()
                .ok()
                .and_then(serial_date)
                .map(Cell::Date)
                .ok_or_else(|| unreadable(&text, column)),
            (_, Some(STYLE_DATETIME)) => text
                .parse()
                .ok()
                .and_then(serial_datetime)
                .map(Cell::DateTime)
                .ok_or_else(|| unreadable(&text, column)),
            _ => match text.parse::<i64>() {
                Ok(value) => Ok(Cell::Integer(value)),
                Err(_) => text
                    .parse()
                    .map(Cell::Number)
                    .map_err(|_| unreadable(&text, column)),
            },
        }
    }
}

fn unreadable(text: &str, column: usize) -> RenderError {
    RenderError::Message(format!("unreadable cell value '{text}' in column {}", column + 1))
}

fn parse_sheet(name: String, xml: &str) -> Result<Sheet, RenderError> {
    let mut sheet = Sheet::new(name);
    let mut reader = Reader::from_str(xml);
    let mut cell: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => open_row(&mut sheet, &attributes(e)?)?,
                b"c" => cell = Some(pending_cell(&attributes(e)?, sheet.rows.len())?),
                b"t" | b"v" => capture = cell.is_some(),
                b"pane" => freeze(&mut sheet, &attributes(e)?),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => open_row(&mut sheet, &attributes(e)?)?,
                b"c" => {
                    let pending = pending_cell(&attributes(e)?, sheet.rows.len())?;
                    place(&mut sheet, pending)?
                }
                b"pane" => freeze(&mut sheet, &attributes(e)?),
                b"autoFilter" => sheet.auto_filter = true,
                _ => {}
            },
            Event::Text(ref e) if capture => {
                if let Some(pending) = cell.as_mut() {
                    let raw = String::from_utf8_lossy(e);
                    pending.text.push_str(&unescape(&raw).map_err(quick_xml::Error::from)?);
                }
            }
            Event::GeneralRef(ref e) if capture => {
                if let Some(pending) = cell.as_mut() {
                    let reference = format!("&{};", String::from_utf8_lossy(e));
                    pending.text.push_str(&unescape(&reference).map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" | b"v" => capture = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        place(&mut sheet, pending)?;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheet)
}

fn open_row(sheet: &mut Sheet, attributes: &Attributes) -> Result<(), RenderError> {
    let number = match attributes.get("r") {
        Some(r) => r
            .parse::<usize>()
            .map_err(|_| RenderError::Message(format!("invalid row number '{r}'")))?,
        None => sheet.rows.len() + 1,
    };
    while sheet.rows.len() < number {
        sheet.rows.push(Vec::new());
    }
    Ok(())
}

fn pending_cell(attributes: &Attributes, rows: usize) -> Result<PendingCell, RenderError> {
    if rows == 0 {
        return Err(RenderError::Message("cell outside a row".to_string()));
    }
    let reference = attribute(attributes, "r")?;
    Ok(PendingCell {
        column: column_index(&reference)?,
        kind: attributes.get("t").cloned(),
        style: attributes.get("s").cloned(),
        text: String::new(),
    })
}

fn place(sheet: &mut Sheet, pending: PendingCell) -> Result<(), RenderError> {
    let column = pending.column;
    let value = pending.finish()?;
    if let Some(row) = sheet.rows.last_mut() {
        if row.len() <= column {
            row.resize(column + 1, Cell::Empty);
        }
        row[column] = value;
    }
    Ok(())
}

fn freeze(sheet: &mut Sheet, attributes: &Attributes) {
    if attributes.get("state").is_some_and(|state| state == "frozen") {
        sheet.freeze_header = true;
    }
}

/// Zero-based column of a reference such as `AB12`.
fn column_index(reference: &str) -> Result<usize, RenderError> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return Err(RenderError::Message(format!("invalid cell reference '{reference}'")));
    }
    let number = letters
        .iter()
        .fold(0usize, |acc, &b| acc * 26 + usize::from(b - b'A' + 1));
    Ok(number - 1)
}

fn serial_date(serial: i64) -> Option<NaiveDate> {
    let days = i32::try_from(serial).ok()?.checked_add(EPOCH_DAYS_FROM_CE)?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

fn serial_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let seconds = (serial * 86_400.0).round() as i64;
    let date = serial_date(seconds.div_euclid(86_400))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        u32::try_from(seconds.rem_euclid(86_400)).ok()?,
        0,
    )?;
    Some(NaiveDateTime::new(date, time))
}

/// Visit every element with its local name and attributes.
fn each_element(
    xml: &str,
    mut visit: impl FnMut(&str, &Attributes) -> Result<(), RenderError>,
) -> Result<(), RenderError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                visit(&name, &attributes(e)?)?;
            }
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

/// Attributes by qualified name, values unescaped.
fn attributes(element: &BytesStart<'_>) -> Result<Attributes, RenderError> {
    let mut map = Attributes::new();
    for attr in element.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(quick_xml::Error::from)?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn attribute(attributes: &Attributes, name: &str) -> Result<String, RenderError> {
    attributes
        .get(name)
        .cloned()
        .ok_or_else(|| RenderError::Message(format!("missing attribute '{name}'")))
}

fn index(attributes: &Attributes, name: &str) -> Result<usize, RenderError> {
    let value = attribute(attributes, name)?;
    value
        .parse()
        .map_err(|_| RenderError::Message(format!("invalid field index '{value}'")))
}

/// Relationship id to `(type, target)`.
fn relationships(xml: &str) -> Result<HashMap<String, (String, String)>, RenderError> {
    let mut map = HashMap::new();
    each_element(xml, |name, attributes| {
        if name == "Relationship" {
            map.insert(
                attribute(attributes, "Id")?,
                (attribute(attributes, "Type")?, attribute(attributes, "Target")?),
            );
        }
        Ok(())
    })?;
    Ok(map)
}

/// Part name of a relationship target, relative to the part that owns it.
fn resolve(owner: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = owner.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// `xl/worksheets/sheet1.xml` has its relationships in
/// `xl/worksheets/_rels/sheet1.xml.rels`.
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, RenderError> {
    read_optional(archive, name)?
        .ok_or_else(|| RenderError::Message(format!("workbook part {name} is missing")))
}

fn read_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, RenderError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(workbook: &Workbook) -> Workbook {
        let mut bytes = Vec::new();
        workbook.write(&mut bytes).unwrap();
        Workbook::read(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn reads_back_what_it_writes() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mut data = Sheet::new("Data");
        data.freeze_header = true;
        data.auto_filter = true;
        data.push(vec![
            Cell::header("Region"),
            Cell::header("When"),
            Cell::header("Stamp"),
            Cell::header("Sales"),
            Cell::header("Open"),
        ]);
        data.push(vec![
            Cell::text(" West & <East> "),
            Cell::Date(date),
            Cell::DateTime(date.and_hms_opt(13, 45, 7).unwrap()),
            Cell::Number(2.5),
            Cell::Boolean(true),
        ]);
        data.push(vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Integer(-4)]);
        let mut notes = Sheet::new("Notes");
        notes.push(vec![Cell::header("Dataset"), Cell::text("orders")]);
        notes.push(Vec::new());
        notes.push(vec![Cell::header("Field")]);

        let read = round_trip(&Workbook::new(vec![notes.clone(), data.clone()]));
        assert!(read.pivot.is_none());
        assert_eq!(read.sheets.len(), 2);
        assert_eq!(read.sheets[0].rows, notes.rows);
        let back = read.sheet("Data").unwrap();
        assert!(back.freeze_header && back.auto_filter);
        assert_eq!(back.rows[0], data.rows[0]);
        assert_eq!(back.rows[1], data.rows[1]);
        assert_eq!(back.rows[2], vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Integer(-4)]);
    }

    #[test]
    fn reads_the_pivot_definition() {
        let mut data = Sheet::new("Data");
        data.push(vec![Cell::header("Region"), Cell::header("Sales")]);
        let pivot = PivotTable {
            sheet: "Pivot".into(),
            source: "Data".into(),
            fields: vec!["Region".into(), "Sales".into()],
            row_fields: vec![0],
            data_fields: vec![1],
        };
        let workbook =
            Workbook::new(vec![Sheet::new("Notes"), Sheet::new("Pivot"), data]).with_pivot(pivot.clone());

        assert_eq!(round_trip(&workbook).pivot, Some(pivot));
    }

    #[test]
    fn part_names_resolve_against_their_owner() {
        assert_eq!(resolve("xl/workbook.xml", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(
            resolve("xl/worksheets/sheet2.xml", "../pivotTables/pivotTable1.xml"),
            "xl/pivotTables/pivotTable1.xml"
        );
        assert_eq!(resolve("xl/workbook.xml", "/xl/styles.xml"), "xl/styles.xml");
        assert_eq!(rels_path("xl/worksheets/sheet2.xml"), "xl/worksheets/_rels/sheet2.xml.rels");
        assert_eq!(column_index("AB12").unwrap(), 27);
        assert!(column_index("12").is_err());
    }

    #[test]
    fn not_a_workbook_is_an_error() {
        let err = Workbook::read(Cursor::new(b"Region,Sales\n".to_vec())).unwrap_err();
        assert!(matches!(err, RenderError::Zip(_)));
    }
}
