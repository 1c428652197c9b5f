//! Build jobs: what to extract, where from, and which files to write.
//!
//! A job can be described in a TOML file and refined on the command line:
//!
//! ```toml
//! metadata = "metadata.json"
//! dataset = "orders.json"
//! source = "orders.csv"
//! output_dir = "out"
//! formats = ["csv", "xlsx", "info"]
//! row_numbers = true
//!
//! [policy]
//! allow_nulls = true
//!
//! [validation]
//! check_hierarchies = true
//! detect_anomalies = true
//! segmentation = "Order Year"
//!
//! [extractor]
//! view = "orders_v"
//! minimise = true
//! ```
//!
//! Relative paths in a job file are resolved against the file's folder.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use dex_extract::ExtractorConfig;
use dex_model::OutputFormat;
use dex_output::BuildOptions;
use dex_validate::{SeverityPolicy, ValidationOptions};

/// How to turn the dataset specification into a query text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Select the dataset columns from the configured view.
    #[default]
    View,
    /// Group dimensions and sum measures.
    Subset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    pub strict: bool,
    /// Report every issue as a warning.
    pub permissive: bool,
    pub allow_nulls: bool,
}

impl PolicySettings {
    pub fn policy(&self) -> Result<SeverityPolicy> {
        match (self.strict, self.permissive) {
            (true, true) => bail!("strict and permissive policies cannot be combined"),
            (false, true) => Ok(SeverityPolicy::permissive()),
            (true, false) => Ok(SeverityPolicy::strict().allow_nulls(self.allow_nulls)),
            (false, false) => Ok(SeverityPolicy::soft().allow_nulls(self.allow_nulls)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub check_hierarchies: bool,
    pub report_unused_domain_values: bool,
    pub detect_anomalies: bool,
    /// Column to segment by when detecting anomalies, e.g. a year.
    pub segmentation: Option<String>,
}

impl ValidationSettings {
    pub fn options(&self) -> Result<ValidationOptions> {
        let options = ValidationOptions::new()
            .with_check_hierarchies(self.check_hierarchies)
            .with_unused_domain_values(self.report_unused_domain_values)
            .with_anomaly_detection(self.detect_anomalies, self.segmentation.clone())
            .context("--detect-anomalies needs --segment-by or `segmentation` in the job file")?;
        Ok(options)
    }
}

/// A job as written in a file or assembled from flags. Every field is
/// optional until [`resolve`](Self::resolve).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobFile {
    pub metadata: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub delimiter: Option<char>,
    pub output_dir: Option<PathBuf>,
    pub formats: Vec<OutputFormat>,
    pub force: bool,
    pub row_numbers: bool,
    /// Also write the extraction query text here.
    pub save_query: Option<PathBuf>,
    pub query: QueryKind,
    pub policy: PolicySettings,
    pub validation: ValidationSettings,
    pub extractor: ExtractorConfig,
}

impl JobFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse job file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read job file {}", path.display()))?;
        let job = Self::parse(&text).with_context(|| format!("in {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(job.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let rebase = |path: &mut Option<PathBuf>| {
            if let Some(p) = path.as_mut()
                && p.is_relative()
            {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.metadata);
        rebase(&mut self.dataset);
        rebase(&mut self.source);
        rebase(&mut self.output_dir);
        rebase(&mut self.save_query);
        rebase(&mut self.extractor.file_path);
        self
    }

    /// Layer `flags` over this job. Paths and formats given on the command
    /// line replace the file's; switches can only be turned on.
    #[must_use]
    pub fn merge(self, flags: JobFile) -> Self {
        Self {
            metadata: flags.metadata.or(self.metadata),
            dataset: flags.dataset.or(self.dataset),
            source: flags.source.or(self.source),
            delimiter: flags.delimiter.or(self.delimiter),
            output_dir: flags.output_dir.or(self.output_dir),
            formats: if flags.formats.is_empty() {
                self.formats
            } else {
                flags.formats
            },
            force: self.force || flags.force,
            row_numbers: self.row_numbers || flags.row_numbers,
            save_query: flags.save_query.or(self.save_query),
            query: if flags.query == QueryKind::default() {
                self.query
            } else {
                flags.query
            },
            policy: PolicySettings {
                strict: self.policy.strict || flags.policy.strict,
                permissive: self.policy.permissive || flags.policy.permissive,
                allow_nulls: self.policy.allow_nulls || flags.policy.allow_nulls,
            },
            validation: ValidationSettings {
                check_hierarchies: self.validation.check_hierarchies
                    || flags.validation.check_hierarchies,
                report_unused_domain_values: self.validation.report_unused_domain_values
                    || flags.validation.report_unused_domain_values,
                detect_anomalies: self.validation.detect_anomalies
                    || flags.validation.detect_anomalies,
                segmentation: flags.validation.segmentation.or(self.validation.segmentation),
            },
            extractor: ExtractorConfig {
                view: flags.extractor.view.or(self.extractor.view),
                schema: flags.extractor.schema.or(self.extractor.schema),
                file_path: flags.extractor.file_path.or(self.extractor.file_path),
                minimise: self.extractor.minimise || flags.extractor.minimise,
            },
        }
    }

    /// Check that the required inputs are present.
    pub fn resolve(self) -> Result<Job> {
        let metadata = self
            .metadata
            .ok_or_else(|| anyhow!("no metadata file given (--metadata or `metadata` in the job file)"))?;
        let dataset = self
            .dataset
            .ok_or_else(|| anyhow!("no dataset file given (--dataset or `dataset` in the job file)"))?;
        let source = self
            .source
            .or_else(|| self.extractor.file_path.clone())
            .ok_or_else(|| anyhow!("no source data given (--source or `source` in the job file)"))?;
        let delimiter = match self.delimiter {
            None => b',',
            Some(c) if c.is_ascii() => c as u8,
            Some(c) => bail!("delimiter {c:?} is not a single-byte character"),
        };
        let formats = if self.formats.is_empty() {
            vec![OutputFormat::Csv]
        } else {
            let mut formats = self.formats;
            let mut seen = Vec::with_capacity(formats.len());
            formats.retain(|format| {
                let first = !seen.contains(format);
                seen.push(*format);
                first
            });
            formats
        };
        let policy = self.policy.policy()?;
        let validation = self.validation.options()?;
        Ok(Job {
            metadata,
            dataset,
            source,
            delimiter,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            formats,
            build: BuildOptions::new()
                .with_force(self.force)
                .with_row_numbers(self.row_numbers),
            save_query: self.save_query,
            query: self.query,
            policy,
            validation,
            extractor: self.extractor,
        })
    }
}

/// A complete, checked job.
#[derive(Debug, Clone)]
pub struct Job {
    pub metadata: PathBuf,
    pub dataset: PathBuf,
    pub source: PathBuf,
    pub delimiter: u8,
    pub output_dir: PathBuf,
    /// Requested formats, first occurrence order, never empty.
    pub formats: Vec<OutputFormat>,
    pub build: BuildOptions,
    pub save_query: Option<PathBuf>,
    pub query: QueryKind,
    pub policy: SeverityPolicy,
    pub validation: ValidationOptions,
    pub extractor: ExtractorConfig,
}
