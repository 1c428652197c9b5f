//! Cached extraction and validation of one dataset.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use dex_model::{DatasetSpecification, MetadataSchema, Row};
use dex_validate::{Severity, SeverityPolicy, ValidationOptions, ValidationReport, validate};

use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, QueryError, Result};
use crate::query::{Query, QueryBuilder, QueryContext};
use crate::source::{FetchRequest, RowSource};

/// Rows and report of a completed extraction.
#[derive(Debug, Clone)]
struct Extraction {
    query: Option<Query>,
    rows: Vec<Row>,
    report: ValidationReport,
}

/// Pulls the rows of one dataset from a row source and validates them.
///
/// The first call to [`extract`](Self::extract) fetches and validates; later
/// calls reuse the cached rows and report until [`invalidate`](Self::invalidate).
pub struct DataExtractor {
    config: ExtractorConfig,
    spec: Arc<DatasetSpecification>,
    schema: Arc<MetadataSchema>,
    source: Box<dyn RowSource>,
    query_builder: Option<Box<dyn QueryBuilder>>,
    options: ValidationOptions,
    policy: SeverityPolicy,
    state: Option<Extraction>,
}

impl DataExtractor {
    pub fn new(
        config: ExtractorConfig,
        spec: Arc<DatasetSpecification>,
        schema: Arc<MetadataSchema>,
        source: impl RowSource + 'static,
    ) -> Self {
        Self {
            config,
            spec,
            schema,
            source: Box::new(source),
            query_builder: None,
            options: ValidationOptions::default(),
            policy: SeverityPolicy::default(),
            state: None,
        }
    }

    #[must_use]
    pub fn with_query_builder(mut self, builder: impl QueryBuilder + 'static) -> Self {
        self.query_builder = Some(Box::new(builder));
        self.state = None;
        self
    }

    #[must_use]
    pub fn with_validation_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self.state = None;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn spec(&self) -> &Arc<DatasetSpecification> {
        &self.spec
    }

    pub fn schema(&self) -> &Arc<MetadataSchema> {
        &self.schema
    }

    pub fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    /// Whether rows are cached.
    pub fn is_extracted(&self) -> bool {
        self.state.is_some()
    }

    /// Fetch and validate the dataset unless already done.
    pub fn extract(&mut self) -> Result<()> {
        if self.state.is_some() {
            debug!(dataset = %self.spec.name(), "using cached extraction");
            return Ok(());
        }

        let start = Instant::now();
        let dataset = self.spec.name().to_string();
        self.options.check(&self.schema)?;
        let query = self.build_query()?;
        if let Some(query) = &query {
            debug!(dataset = %dataset, sql = %query.sql, params = query.parameters.len(), "built query");
        }

        let request = FetchRequest {
            query: query.as_ref(),
            file_path: self.config.file_path.as_deref(),
        };
        let fetched = self
            .source
            .fetch(&request)
            .map_err(|source| ExtractionError::Source {
                source_name: self.source.describe(),
                source,
            })?;
        debug!(dataset = %dataset, rows = fetched.len(), source = %self.source.describe(), "fetched rows");

        let rows = self.shape_rows(fetched);
        let report = validate(&self.schema, Some(&self.spec), &rows, &self.options);
        self.log_report(&report);

        info!(
            dataset = %dataset,
            rows = rows.len(),
            fatal = report.fatal_count(&self.policy),
            warnings = report.warning_count(&self.policy),
            duration_ms = start.elapsed().as_millis(),
            "extraction complete"
        );
        self.state = Some(Extraction {
            query,
            rows,
            report,
        });
        Ok(())
    }

    /// Drop cached rows so the next extraction fetches again.
    pub fn invalidate(&mut self) {
        if self.state.take().is_some() {
            debug!(dataset = %self.spec.name(), "extraction invalidated");
        }
    }

    /// Extract if needed and report whether the data has no fatal issues.
    pub fn validate_data(&mut self) -> Result<bool> {
        self.extract()?;
        Ok(self
            .report()
            .is_some_and(|report| report.is_usable(&self.policy)))
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        self.state.as_ref().map(|state| &state.report)
    }

    pub fn rows(&self) -> Option<&[Row]> {
        self.state.as_ref().map(|state| state.rows.as_slice())
    }

    pub fn row_count(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.rows.len())
    }

    pub fn query(&self) -> Option<&Query> {
        self.state.as_ref().and_then(|state| state.query.as_ref())
    }

    /// Write the SQL of the built query to `path`.
    pub fn save_query(&mut self, path: &Path) -> Result<()> {
        let sql = match self.query() {
            Some(query) => query.sql.clone(),
            None => self.build_query()?.ok_or(QueryError::NotConfigured)?.sql,
        };
        fs::write(path, sql).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(dataset = %self.spec.name(), path = %path.display(), "query saved");
        Ok(())
    }

    fn build_query(&self) -> Result<Option<Query>> {
        let Some(builder) = &self.query_builder else {
            return Ok(None);
        };
        let ctx = QueryContext {
            config: &self.config,
            schema: &self.schema,
            spec: &self.spec,
        };
        Ok(Some(builder.build(&ctx)?))
    }

    /// Rename physical columns to metadata names and minimise if configured.
    ///
    /// Minimising keeps the anomaly segmentation column as well.
    fn shape_rows(&self, rows: Vec<Row>) -> Vec<Row> {
        let names: HashMap<&str, &str> = self
            .schema
            .columns()
            .iter()
            .map(|column| (column.physical_name(), column.name.as_str()))
            .collect();
        let segmentation = self
            .options
            .anomaly_segmentation
            .as_deref()
            .map(|column| {
                if self.schema.contains(column) {
                    column
                } else {
                    names.get(column).copied().unwrap_or(column)
                }
            });
        let keep: Option<HashSet<&str>> = self.config.minimise.then(|| {
            self.spec
                .columns()
                .filter(|name| self.schema.get(name).is_some_and(|c| !c.is_computed()))
                .chain(segmentation)
                .collect()
        });

        rows.into_iter()
            .map(|row| {
                row.remap(|key| {
                    let name = if self.schema.contains(key) {
                        key
                    } else {
                        names.get(key).copied().unwrap_or(key)
                    };
                    match &keep {
                        Some(keep) if !keep.contains(name) => None,
                        _ => Some(name.to_string()),
                    }
                })
            })
            .collect()
    }

    fn log_report(&self, report: &ValidationReport) {
        for (severity, issue) in report.sorted_by_severity(&self.policy) {
            match severity {
                Severity::Fatal => error!(dataset = %report.dataset, "{issue}"),
                Severity::Warning => warn!(dataset = %report.dataset, "{issue}"),
            }
        }
    }
}
