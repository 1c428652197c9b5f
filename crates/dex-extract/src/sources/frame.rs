//! Polars `DataFrame` row source.

use std::path::Path;

use polars::prelude::{AnyValue, CsvReadOptions, DataFrame, SerReader};

use dex_common::any_to_string;
use dex_model::{RawValue, Row};

use crate::error::SourceError;
use crate::source::{FetchRequest, RowSource};

/// Serves the rows of an in-memory data frame.
#[derive(Debug, Clone)]
pub struct DataFrameSource {
    frame: DataFrame,
}

impl DataFrameSource {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Load a CSV file with Polars type inference.
    pub fn from_csv(path: &Path) -> Result<Self, SourceError> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Ok(Self::new(frame))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

impl RowSource for DataFrameSource {
    fn describe(&self) -> String {
        format!(
            "data frame ({} rows x {} columns)",
            self.frame.height(),
            self.frame.width()
        )
    }

    fn fetch(&self, _request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        let columns = self.frame.get_columns();
        let mut rows = Vec::with_capacity(self.frame.height());
        for row_idx in 0..self.frame.height() {
            let row: Row = columns
                .iter()
                .map(|col| {
                    let value = col.get(row_idx).unwrap_or(AnyValue::Null);
                    (col.name().to_string(), raw_value(value))
                })
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

fn raw_value(value: AnyValue<'_>) -> RawValue {
    match value {
        AnyValue::Null => RawValue::Null,
        AnyValue::Boolean(b) => RawValue::Boolean(b),
        AnyValue::Int8(v) => RawValue::Integer(i64::from(v)),
        AnyValue::Int16(v) => RawValue::Integer(i64::from(v)),
        AnyValue::Int32(v) => RawValue::Integer(i64::from(v)),
        AnyValue::Int64(v) => RawValue::Integer(v),
        AnyValue::UInt8(v) => RawValue::Integer(i64::from(v)),
        AnyValue::UInt16(v) => RawValue::Integer(i64::from(v)),
        AnyValue::UInt32(v) => RawValue::Integer(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v).map_or_else(
            |_| RawValue::Text(v.to_string()),
            RawValue::Integer,
        ),
        AnyValue::Float32(v) => RawValue::Float(f64::from(v)),
        AnyValue::Float64(v) => RawValue::Float(v),
        other => RawValue::Text(any_to_string(other)),
    }
}
