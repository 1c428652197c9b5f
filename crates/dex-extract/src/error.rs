use std::path::PathBuf;

use thiserror::Error;

use dex_validate::OptionsError;

/// Failure inside a row source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("data frame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    /// The source needs a file path and none was configured.
    #[error("no file path configured")]
    MissingPath,

    /// The source executes queries and none was built.
    #[error("no query was built for this source")]
    MissingQuery,

    /// Error returned by an injected query executor.
    #[error("query execution failed: {0}")]
    Executor(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure while building a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no view configured for query building")]
    MissingView,

    #[error("no query builder configured")]
    NotConfigured,

    #[error("no selectable columns in dataset '{dataset}'")]
    NoColumns { dataset: String },
}

/// Errors raised by [`DataExtractor`](crate::DataExtractor).
///
/// Data-quality problems are never errors; they live in the report.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("row source '{source_name}' failed: {source}")]
    Source {
        source_name: String,
        #[source]
        source: SourceError,
    },

    #[error("query building failed: {0}")]
    Query(#[from] QueryError),

    #[error("invalid validation options: {0}")]
    Options(#[from] OptionsError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
