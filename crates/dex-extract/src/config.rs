use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where an extractor reads from and how it shapes what it reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// View queried by SQL query builders.
    pub view: Option<String>,
    /// Database schema holding `view`.
    pub schema: Option<String>,
    /// Data file for file-backed row sources.
    pub file_path: Option<PathBuf>,
    /// Keep only the sourced columns of the dataset.
    pub minimise: bool,
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_minimise(mut self, minimise: bool) -> Self {
        self.minimise = minimise;
        self
    }
}
