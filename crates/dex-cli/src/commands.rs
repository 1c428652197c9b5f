use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::{info, info_span, warn};

use dex_extract::{CsvFileSource, DataExtractor, SubsetQueryBuilder, ViewQueryBuilder};
use dex_model::{ColumnMetadata, DatasetSpecification, MetadataSchema};
use dex_output::{BuildError, BuildOutput, DatasetBuilder, DatasetSplitter, SplitSummary};
use dex_validate::{SeverityPolicy, ValidationReport};

use crate::job::{Job, QueryKind};
use crate::summary::apply_table_style;

/// Outcome of extracting (and possibly building) one dataset.
#[derive(Debug, Clone)]
pub struct DatasetResult {
    pub dataset: String,
    pub source: PathBuf,
    pub rows: usize,
    pub report: ValidationReport,
    pub policy: SeverityPolicy,
    pub outputs: Vec<BuildOutput>,
    /// Where the query text was saved, if requested.
    pub query_file: Option<PathBuf>,
    /// Fatal issues stopped the build.
    pub blocked: bool,
}

impl DatasetResult {
    pub fn fatal_count(&self) -> usize {
        self.report.fatal_count(&self.policy)
    }

    pub fn warning_count(&self) -> usize {
        self.report.warning_count(&self.policy)
    }

    /// The run should end with a failing exit code.
    pub fn has_errors(&self) -> bool {
        self.blocked || (self.fatal_count() > 0 && !self.outputs.iter().any(|o| o.forced))
    }
}

fn load_inputs(job: &Job) -> Result<(MetadataSchema, DatasetSpecification)> {
    let schema = MetadataSchema::load_file(&job.metadata)
        .with_context(|| format!("load metadata {}", job.metadata.display()))?;
    let spec = DatasetSpecification::load_file(&job.dataset, &schema)
        .with_context(|| format!("load dataset specification {}", job.dataset.display()))?;
    Ok((schema, spec))
}

fn extractor_for(job: &Job) -> Result<DataExtractor> {
    let (schema, spec) = load_inputs(job)?;
    let source = CsvFileSource::from_path(&job.source).with_delimiter(job.delimiter);
    let extractor = DataExtractor::new(job.extractor.clone(), Arc::new(spec), Arc::new(schema), source)
        .with_validation_options(job.validation.clone())
        .with_policy(job.policy.clone());
    // A query is only built when there is a view to query.
    if job.extractor.view.is_none() {
        return Ok(extractor);
    }
    Ok(match job.query {
        QueryKind::View => extractor.with_query_builder(ViewQueryBuilder),
        QueryKind::Subset => extractor.with_query_builder(SubsetQueryBuilder),
    })
}

fn save_query(extractor: &mut DataExtractor, path: Option<&Path>) -> Result<Option<PathBuf>> {
    let Some(path) = path else {
        return Ok(None);
    };
    extractor
        .save_query(path)
        .with_context(|| format!("save query to {}", path.display()))?;
    Ok(Some(path.to_path_buf()))
}

/// Extract once and write every requested format.
pub fn run_build(job: &Job) -> Result<DatasetResult> {
    let start = Instant::now();
    let mut builder = DatasetBuilder::new(extractor_for(job)?).with_options(job.build);
    let dataset = builder.extractor().spec().name().to_string();
    let span = info_span!("dataset", dataset = %dataset);
    let _guard = span.enter();

    builder.validate_metadata();
    let query_file = save_query(builder.extractor_mut(), job.save_query.as_deref())?;

    let mut outputs = Vec::with_capacity(job.formats.len());
    let mut blocked = false;
    for format in &job.formats {
        match builder.build_into(&job.output_dir, *format) {
            Ok(output) => outputs.push(output),
            Err(BuildError::Validation { fatal, .. }) => {
                warn!(fatal, "fatal data-quality issues; no files written");
                blocked = true;
                break;
            }
            Err(error) => {
                return Err(error).with_context(|| format!("build {format} output for {dataset}"));
            }
        }
    }

    let extractor = builder.extractor();
    info!(
        outputs = outputs.len(),
        duration_ms = start.elapsed().as_millis(),
        "build finished"
    );
    Ok(DatasetResult {
        dataset,
        source: job.source.clone(),
        rows: extractor.row_count(),
        report: extractor.report().cloned().unwrap_or_default(),
        policy: extractor.policy().clone(),
        outputs,
        query_file,
        blocked,
    })
}

/// Extract and validate without writing any dataset file.
pub fn run_validate(job: &Job) -> Result<DatasetResult> {
    let mut extractor = extractor_for(job)?;
    let dataset = extractor.spec().name().to_string();
    let span = info_span!("dataset", dataset = %dataset);
    let _guard = span.enter();

    let usable = extractor
        .validate_data()
        .with_context(|| format!("extract {dataset} from {}", job.source.display()))?;
    let query_file = save_query(&mut extractor, job.save_query.as_deref())?;
    Ok(DatasetResult {
        dataset,
        source: job.source.clone(),
        rows: extractor.row_count(),
        report: extractor.report().cloned().unwrap_or_default(),
        policy: extractor.policy().clone(),
        outputs: Vec::new(),
        query_file,
        blocked: !usable,
    })
}

/// List schema columns, optionally narrowed to a group or a hierarchy.
pub fn run_columns(metadata: &Path, group: Option<&str>, hierarchy: Option<&str>) -> Result<Table> {
    let schema = MetadataSchema::load_file(metadata)
        .with_context(|| format!("load metadata {}", metadata.display()))?;
    let mut columns: Vec<&ColumnMetadata> = match hierarchy {
        Some(name) => schema.columns_in_hierarchy(name),
        None => schema.columns().iter().collect(),
    };
    if let Some(group) = group {
        columns.retain(|column| column.in_group(group));
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Type", "Source", "Groups", "Hierarchies", "Description"]);
    apply_table_style(&mut table);
    for column in columns {
        let hierarchies = column
            .hierarchies
            .iter()
            .map(|h| format!("{}:{}", h.hierarchy, h.level))
            .collect::<Vec<_>>()
            .join(", ");
        let source = if column.is_computed() {
            "(computed)".to_string()
        } else {
            column.physical_name().to_string()
        };
        table.add_row(vec![
            column.name.clone(),
            column.datatype.to_string(),
            source,
            column.groups.join(", "),
            hierarchies,
            column.description.clone(),
        ]);
    }
    Ok(table)
}

pub fn run_split(field: &str, source: &Path, output: &Path) -> Result<SplitSummary> {
    let splitter = DatasetSplitter::new(field, source, output)
        .with_context(|| format!("split {} by {field}", source.display()))?;
    let summary = splitter
        .split()
        .with_context(|| format!("split {} by {field}", source.display()))?;
    Ok(summary)
}
