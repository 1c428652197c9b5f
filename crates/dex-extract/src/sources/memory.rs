use dex_model::Row;

use crate::error::SourceError;
use crate::source::{FetchRequest, RowSource};

/// Serves pre-built rows.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    name: String,
    rows: Vec<Row>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

impl RowSource for InMemorySource {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn fetch(&self, _request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        Ok(self.rows.clone())
    }
}
