use std::path::PathBuf;

use thiserror::Error;

use dex_extract::ExtractionError;
use dex_model::{ModelError, OutputFormat};

/// Failure while serializing a canonical table.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

/// Errors raised by [`DatasetBuilder`](crate::DatasetBuilder).
#[derive(Debug, Error)]
pub enum BuildError {
    /// The data has fatal issues and the build was not forced.
    #[error("dataset '{dataset}' failed validation ({fatal} fatal, {warnings} warnings)")]
    Validation {
        dataset: String,
        fatal: usize,
        warnings: usize,
    },

    #[error("no renderer registered for format '{format}'")]
    UnsupportedFormat { format: OutputFormat },

    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("projection failed: {0}")]
    Projection(#[from] ModelError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by [`DatasetSplitter`](crate::DatasetSplitter).
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("source folder does not exist: {path}")]
    MissingSource { path: PathBuf },

    #[error("source and output folders are the same: {path}")]
    SameFolder { path: PathBuf },

    #[error("{path} contains subdirectories")]
    NestedFolder { path: PathBuf },

    #[error("field '{field}' not found in {path}")]
    MissingField { field: String, path: PathBuf },

    #[error("no CSV files or data workbooks found in {path}")]
    NothingToSplit { path: PathBuf },

    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to split workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BuildError>;
