//! CSV file row source.
//!
//! Values are kept as text; empty fields become null. Interpreting types is
//! the validation engine's job.

use std::path::{Path, PathBuf};

use tracing::debug;

use dex_model::{RawValue, Row};

use crate::error::SourceError;
use crate::source::{FetchRequest, RowSource};

/// Reads rows from a CSV file with a header row.
#[derive(Debug, Clone, Default)]
pub struct CsvFileSource {
    path: Option<PathBuf>,
    delimiter: Option<u8>,
}

impl CsvFileSource {
    /// A source that reads the file named in each fetch request.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source bound to one file, regardless of the request.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            delimiter: None,
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    fn resolve<'a>(&'a self, request: &FetchRequest<'a>) -> Option<&'a Path> {
        self.path.as_deref().or(request.file_path)
    }
}

impl RowSource for CsvFileSource {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("csv:{}", path.display()),
            None => "csv".to_string(),
        }
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        let path = self.resolve(request).ok_or(SourceError::MissingPath)?;
        read_rows(path, self.delimiter.unwrap_or(b','))
    }
}

fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<Row>, SourceError> {
    let csv_error = |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, field)| {
                let value = if field.is_empty() {
                    RawValue::Null
                } else {
                    RawValue::Text(field.to_string())
                };
                (name, value)
            })
            .collect();
        rows.push(row);
    }
    debug!(path = %path.display(), rows = rows.len(), "read csv rows");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn reads_text_and_nulls() {
        let file = create_temp_csv("Region,Sales\nWest,10.5\nEast,\n");
        let rows = CsvFileSource::from_path(file.path())
            .fetch(&FetchRequest::default())
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Sales"), Some(&RawValue::from("10.5")));
        assert_eq!(rows[1].get("Sales"), Some(&RawValue::Null));
    }

    #[test]
    fn uses_request_path_when_unbound() {
        let file = create_temp_csv("A;B\n1;2\n");
        let request = FetchRequest {
            query: None,
            file_path: Some(file.path()),
        };
        let rows = CsvFileSource::new()
            .with_delimiter(b';')
            .fetch(&request)
            .unwrap();
        assert_eq!(rows[0].names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn ragged_rows_are_errors() {
        let file = create_temp_csv("A,B\n1,2,3\n");
        let err = CsvFileSource::from_path(file.path())
            .fetch(&FetchRequest::default())
            .unwrap_err();
        assert!(matches!(err, SourceError::Csv { .. }));
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = CsvFileSource::new()
            .fetch(&FetchRequest::default())
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingPath));
    }
}
