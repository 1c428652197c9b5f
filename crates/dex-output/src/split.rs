//! Partitioning built CSV files and workbooks by the values of one field.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::builder::file_stem;
use crate::error::{RenderError, SplitError};
use crate::renderers::workbook::{Cell, Workbook};
use crate::renderers::{DATA_SHEET, NOTES_SHEET, set_row_count};

type Result<T> = std::result::Result<T, SplitError>;

/// Splits every CSV file and every workbook with a `Data` sheet in a folder
/// into one sub-folder per distinct value of a field. Other files, info
/// workbooks included, are copied into each sub-folder.
#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    field: String,
    source: PathBuf,
    output: PathBuf,
}

/// What a split produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// CSV files and workbooks that were split.
    pub files: usize,
    /// Sub-folder names, one per distinct field value.
    pub partitions: BTreeSet<String>,
    /// Other files copied into every partition.
    pub copied: usize,
}

impl DatasetSplitter {
    /// Check the folders. Nothing is touched until [`split`](Self::split).
    ///
    /// The source must exist and hold no sub-folders. An existing output
    /// folder is replaced, so it may only hold a previous split.
    pub fn new(
        field: impl Into<String>,
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Result<Self> {
        let splitter = Self {
            field: field.into(),
            source: source.into(),
            output: output.into(),
        };
        if !splitter.source.is_dir() {
            return Err(SplitError::MissingSource {
                path: splitter.source,
            });
        }
        if splitter.source == splitter.output {
            return Err(SplitError::SameFolder {
                path: splitter.source,
            });
        }
        if has_subdirectory(&splitter.source)? {
            return Err(SplitError::NestedFolder {
                path: splitter.source,
            });
        }
        if splitter.output.is_dir() && holds_nested_folders(&splitter.output)? {
            return Err(SplitError::NestedFolder {
                path: splitter.output,
            });
        }
        Ok(splitter)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Replace the output folder with one partition per field value.
    pub fn split(&self) -> Result<SplitSummary> {
        if self.output.exists() {
            info!(path = %self.output.display(), "removing previous output");
            fs::remove_dir_all(&self.output).map_err(io("remove", &self.output))?;
        }
        fs::create_dir_all(&self.output).map_err(io("create", &self.output))?;

        let entries = sorted_files(&self.source)?;
        let mut summary = SplitSummary::default();
        let mut others = Vec::new();
        for path in &entries {
            let partitions = if is_csv(path) {
                self.split_csv(path)?
            } else if is_workbook(path) {
                match self.split_workbook(path)? {
                    Some(partitions) => partitions,
                    None => {
                        others.push(path);
                        continue;
                    }
                }
            } else {
                others.push(path);
                continue;
            };
            summary.files += 1;
            summary.partitions.extend(partitions);
        }
        if summary.files == 0 {
            return Err(SplitError::NothingToSplit {
                path: self.source.clone(),
            });
        }

        for path in others {
            let Some(name) = path.file_name() else {
                continue;
            };
            for partition in &summary.partitions {
                let target = self.output.join(partition).join(name);
                fs::copy(path, &target).map_err(io("copy", &target))?;
            }
            debug!(file = %path.display(), "copied into partitions");
            summary.copied += 1;
        }
        info!(
            field = %self.field,
            files = summary.files,
            partitions = summary.partitions.len(),
            "split complete"
        );
        Ok(summary)
    }

    fn split_csv(&self, path: &Path) -> Result<BTreeSet<String>> {
        info!(file = %path.display(), field = %self.field, "splitting CSV file");
        let csv_error = |source| SplitError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        let index = headers
            .iter()
            .position(|name| name == self.field)
            .ok_or_else(|| SplitError::MissingField {
                field: self.field.clone(),
                path: path.to_path_buf(),
            })?;
        let file_name = path.file_name().unwrap_or_default();

        let mut writers: BTreeMap<String, csv::Writer<File>> = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let partition = file_stem(record.get(index).unwrap_or_default());
            if !writers.contains_key(&partition) {
                let dir = self.output.join(&partition);
                fs::create_dir_all(&dir).map_err(io("create", &dir))?;
                let target = dir.join(file_name);
                let mut writer = csv::Writer::from_path(&target).map_err(|source| SplitError::Csv {
                    path: target.clone(),
                    source,
                })?;
                writer.write_record(&headers).map_err(csv_error)?;
                writers.insert(partition.clone(), writer);
            }
            if let Some(writer) = writers.get_mut(&partition) {
                writer.write_record(&record).map_err(csv_error)?;
            }
        }

        let mut partitions = BTreeSet::new();
        for (partition, mut writer) in writers {
            writer.flush().map_err(io("write", &self.output.join(&partition)))?;
            partitions.insert(partition);
        }
        Ok(partitions)
    }
}

impl DatasetSplitter {
    /// Split the `Data` sheet of a workbook, keeping its other sheets and
    /// pivot. `None` when there is no `Data` sheet.
    fn split_workbook(&self, path: &Path) -> Result<Option<BTreeSet<String>>> {
        let file = File::open(path).map_err(io("open", path))?;
        let workbook = Workbook::read(BufReader::new(file)).map_err(workbook(path))?;
        let Some(data) = workbook.sheet(DATA_SHEET) else {
            debug!(file = %path.display(), "workbook has no data sheet");
            return Ok(None);
        };
        info!(file = %path.display(), field = %self.field, "splitting workbook");

        let missing_field = || SplitError::MissingField {
            field: self.field.clone(),
            path: path.to_path_buf(),
        };
        let (header, records) = data.rows.split_first().ok_or_else(missing_field)?;
        let index = header
            .iter()
            .position(|cell| cell.to_string() == self.field)
            .ok_or_else(missing_field)?;

        let mut groups: BTreeMap<String, Vec<Vec<Cell>>> = BTreeMap::new();
        for record in records {
            let value = record.get(index).map(Cell::to_string).unwrap_or_default();
            groups.entry(file_stem(&value)).or_default().push(record.clone());
        }

        let file_name = path.file_name().unwrap_or_default();
        for (partition, rows) in &groups {
            let mut part = workbook.clone();
            if let Some(sheet) = part.sheet_mut(DATA_SHEET) {
                sheet.rows = std::iter::once(header.clone())
                    .chain(rows.iter().cloned())
                    .collect();
            }
            if let Some(notes) = part.sheet_mut(NOTES_SHEET) {
                set_row_count(notes, rows.len());
            }

            let dir = self.output.join(partition);
            fs::create_dir_all(&dir).map_err(io("create", &dir))?;
            let target = dir.join(file_name);
            let mut file = File::create(&target).map_err(io("create", &target))?;
            part.write(&mut file).map_err(self::workbook(&target))?;
        }
        Ok(Some(groups.into_keys().collect()))
    }
}

fn io(operation: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> SplitError {
    let path = path.to_path_buf();
    move |source| SplitError::Io {
        operation,
        path,
        source,
    }
}

fn workbook(path: &Path) -> impl FnOnce(RenderError) -> SplitError {
    let path = path.to_path_buf();
    move |source| SplitError::Workbook { path, source }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io("read", dir))? {
        let path = entry.map_err(io("read", dir))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_subdirectory(dir: &Path) -> Result<bool> {
    for entry in fs::read_dir(dir).map_err(io("read", dir))? {
        if entry.map_err(io("read", dir))?.path().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether any folder inside `dir` holds a folder of its own.
fn holds_nested_folders(dir: &Path) -> Result<bool> {
    for entry in fs::read_dir(dir).map_err(io("read", dir))? {
        let path = entry.map_err(io("read", dir))?.path();
        if path.is_dir() && has_subdirectory(&path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderers::workbook::Sheet;
    use crate::renderers::{XlsxRenderer, notes_sheet};
    use chrono::NaiveDate;
    use dex_model::{
        CanonicalTable, ColumnDescriptor, ColumnRole, DataType, DatasetIdentity, Value,
    };

    #[test]
    fn partitions_csv_and_copies_other_files() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(
            source.path().join("orders.csv"),
            "Region,Sales\nWest,1\nEast,2\nWest,3\n",
        )
        .unwrap();
        fs::write(source.path().join("README.txt"), "notes").unwrap();

        let splitter = DatasetSplitter::new("Region", source.path(), output.path()).unwrap();
        let summary = splitter.split().unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.copied, 1);
        assert_eq!(
            summary.partitions.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["East", "West"]
        );
        let west = fs::read_to_string(output.path().join("West/orders.csv")).unwrap();
        assert_eq!(west, "Region,Sales\nWest,1\nWest,3\n");
        assert!(output.path().join("East/README.txt").exists());
    }

    #[test]
    fn rejects_bad_folders() {
        let source = tempfile::tempdir().unwrap();
        let err = DatasetSplitter::new("Region", source.path(), source.path()).unwrap_err();
        assert!(matches!(err, SplitError::SameFolder { .. }));

        let missing = source.path().join("missing");
        let err = DatasetSplitter::new("Region", &missing, source.path()).unwrap_err();
        assert!(matches!(err, SplitError::MissingSource { .. }));

        let output = tempfile::tempdir().unwrap();
        fs::create_dir_all(output.path().join("West/deeper")).unwrap();
        let err = DatasetSplitter::new("Region", source.path(), output.path()).unwrap_err();
        assert!(matches!(err, SplitError::NestedFolder { .. }));
    }

    #[test]
    fn missing_field_and_empty_source_are_errors() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let out = output.path().join("split");

        let splitter = DatasetSplitter::new("Region", source.path(), &out).unwrap();
        assert!(matches!(
            splitter.split().unwrap_err(),
            SplitError::NothingToSplit { .. }
        ));

        fs::write(source.path().join("data.csv"), "Sales\n1\n").unwrap();
        assert!(matches!(
            splitter.split().unwrap_err(),
            SplitError::MissingField { .. }
        ));
    }

    fn orders() -> CanonicalTable {
        let columns = vec![
            ColumnDescriptor::new("Region", DataType::String, ColumnRole::Dimension),
            ColumnDescriptor::new("Sales", DataType::Double, ColumnRole::Measure),
        ];
        let identity = DatasetIdentity {
            name: "orders".into(),
            ..DatasetIdentity::default()
        };
        let mut table = CanonicalTable::new(identity, columns);
        for (region, sales) in [("West", 1.5), ("East", 2.5), ("West", 3.5)] {
            table
                .push_row(vec![Value::Text(region.into()), Value::Double(sales)])
                .unwrap();
        }
        table
    }

    #[test]
    fn partitions_workbooks_and_copies_info_sheets() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let table = orders();
        let built = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut file = File::create(source.path().join("orders.xlsx")).unwrap();
        XlsxRenderer::workbook(&table, built).write(&mut file).unwrap();
        let mut file = File::create(source.path().join("orders-info.xlsx")).unwrap();
        Workbook::new(vec![notes_sheet(&table, "CSV", built)])
            .write(&mut file)
            .unwrap();

        let splitter = DatasetSplitter::new("Region", source.path(), output.path()).unwrap();
        let summary = splitter.split().unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.copied, 1);
        assert_eq!(
            summary.partitions.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["East", "West"]
        );
        assert!(output.path().join("East/orders-info.xlsx").is_file());

        let west = Workbook::read(File::open(output.path().join("West/orders.xlsx")).unwrap()).unwrap();
        let data = west.sheet(DATA_SHEET).unwrap();
        assert_eq!(data.rows.len(), 3);
        assert_eq!(data.rows[1], vec![Cell::text("West"), Cell::Number(1.5)]);
        assert_eq!(data.rows[2], vec![Cell::text("West"), Cell::Number(3.5)]);
        let notes = west.sheet(NOTES_SHEET).unwrap();
        assert!(notes.rows.contains(&vec![Cell::header("Rows"), Cell::Integer(2)]));
        assert_eq!(west.pivot.unwrap().source, DATA_SHEET);
    }

    #[test]
    fn workbook_without_the_field_is_an_error() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut data = Sheet::new(DATA_SHEET);
        data.push(vec![Cell::header("Sales")]);
        data.push(vec![Cell::Integer(1)]);
        let mut file = File::create(source.path().join("orders.xlsx")).unwrap();
        Workbook::new(vec![data]).write(&mut file).unwrap();

        let splitter = DatasetSplitter::new("Region", source.path(), output.path()).unwrap();
        assert!(matches!(
            splitter.split().unwrap_err(),
            SplitError::MissingField { .. }
        ));
    }
}
