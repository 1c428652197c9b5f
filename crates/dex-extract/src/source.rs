use std::path::Path;

use dex_model::Row;

use crate::error::SourceError;
use crate::query::Query;

/// Parameters of one fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchRequest<'a> {
    pub query: Option<&'a Query>,
    pub file_path: Option<&'a Path>,
}

/// Anything that can produce the rows of a dataset.
///
/// Rows are keyed by physical column name; the extractor maps them to
/// metadata names.
pub trait RowSource {
    /// Short description used in error messages and logs.
    fn describe(&self) -> String;

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        (**self).fetch(request)
    }
}
