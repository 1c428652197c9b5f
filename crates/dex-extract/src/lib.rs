//! Extraction of dataset rows.
//!
//! A [`DataExtractor`] obtains rows from an injected [`RowSource`], optionally
//! through a [`QueryBuilder`], renames physical columns to metadata names and
//! validates the result once. Rows and report are cached for every build that
//! follows.

pub mod config;
pub mod error;
mod extractor;
pub mod query;
pub mod source;
pub mod sources;

pub use config::ExtractorConfig;
pub use error::{ExtractionError, QueryError, Result, SourceError};
pub use extractor::DataExtractor;
pub use query::{Query, QueryBuilder, QueryContext, SubsetQueryBuilder, ViewQueryBuilder};
pub use source::{FetchRequest, RowSource};
pub use sources::{CsvFileSource, DataFrameSource, InMemorySource, QueryRowSource};
