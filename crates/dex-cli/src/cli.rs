//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

use dex_cli::job::{JobFile, PolicySettings, QueryKind, ValidationSettings};
use dex_extract::ExtractorConfig;
use dex_model::OutputFormat;

#[derive(Parser)]
#[command(
    name = "dex",
    version,
    about = "Metadata-driven dataset exports",
    long_about = "Extract a dataset described by a metadata schema and a dataset \
                  specification, check its quality, and write it as CSV, Excel, \
                  an info sheet, a packaged BI datasource or JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract a dataset once and write every requested format.
    Build(BuildArgs),

    /// Extract a dataset and report its data-quality issues.
    Validate(JobArgs),

    /// List the columns of a metadata schema.
    Columns(ColumnsArgs),

    /// Split the CSV files and workbooks of a folder by the values of one field.
    Split(SplitArgs),
}

/// Inputs shared by `build` and `validate`.
#[derive(Args)]
pub struct JobArgs {
    /// TOML job file; flags given here override its values.
    #[arg(long = "job", value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Metadata schema (JSON).
    #[arg(long = "metadata", short = 'm', value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    /// Dataset specification (JSON).
    #[arg(long = "dataset", short = 'd', value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Source data (CSV).
    #[arg(long = "source", short = 's', value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Field delimiter of the source file.
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Treat every constraint violation as fatal.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Report every issue as a warning; nothing blocks the build.
    #[arg(long = "permissive", conflicts_with = "strict")]
    pub permissive: bool,

    /// Report missing values as warnings instead of fatal issues.
    #[arg(long = "allow-nulls")]
    pub allow_nulls: bool,

    /// Check that hierarchy levels roll up consistently.
    #[arg(long = "check-hierarchies")]
    pub check_hierarchies: bool,

    /// Report domain values that never occur in the data.
    #[arg(long = "unused-domain-values")]
    pub unused_domain_values: bool,

    /// Warn about dimensions whose spread of values is unusual in one segment.
    #[arg(long = "detect-anomalies")]
    pub detect_anomalies: bool,

    /// Column to segment by when detecting anomalies, e.g. a year.
    #[arg(long = "segment-by", value_name = "COLUMN")]
    pub segment_by: Option<String>,

    /// Keep only the dataset's sourced columns.
    #[arg(long = "minimise")]
    pub minimise: bool,

    /// View to build the extraction query against.
    #[arg(long = "view", value_name = "NAME")]
    pub view: Option<String>,

    /// Database schema holding the view.
    #[arg(long = "db-schema", value_name = "NAME")]
    pub db_schema: Option<String>,

    /// Kind of query to build for the view.
    #[arg(long = "query", value_enum)]
    pub query: Option<QueryArg>,

    /// Write the extraction query to this file.
    #[arg(long = "save-query", value_name = "FILE")]
    pub save_query: Option<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Output format; repeat for several.
    #[arg(long = "format", short = 'f', value_parser = parse_format)]
    pub formats: Vec<OutputFormat>,

    /// Output directory (default: the current directory).
    #[arg(long = "output-dir", short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write outputs even when the data has fatal issues.
    #[arg(long = "force")]
    pub force: bool,

    /// Prepend a 1-based row number column.
    #[arg(long = "row-numbers")]
    pub row_numbers: bool,
}

#[derive(Args)]
pub struct ColumnsArgs {
    /// Metadata schema (JSON).
    #[arg(long = "metadata", short = 'm', value_name = "FILE")]
    pub metadata: PathBuf,

    /// Only columns tagged with this group.
    #[arg(long = "group")]
    pub group: Option<String>,

    /// Only members of this hierarchy, top level first.
    #[arg(long = "hierarchy")]
    pub hierarchy: Option<String>,
}

#[derive(Args)]
pub struct SplitArgs {
    /// Column whose values name the partitions.
    #[arg(long = "field")]
    pub field: String,

    /// Folder of built files.
    #[arg(long = "source", value_name = "DIR")]
    pub source: PathBuf,

    /// Folder to write partitions into; replaced if it exists.
    #[arg(long = "output", value_name = "DIR")]
    pub output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum QueryArg {
    View,
    Subset,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

impl JobArgs {
    /// The job these flags describe, ready to be layered over a job file.
    pub fn to_job_file(&self) -> JobFile {
        JobFile {
            metadata: self.metadata.clone(),
            dataset: self.dataset.clone(),
            source: self.source.clone(),
            delimiter: self.delimiter,
            save_query: self.save_query.clone(),
            query: match self.query {
                Some(QueryArg::Subset) => QueryKind::Subset,
                Some(QueryArg::View) | None => QueryKind::View,
            },
            policy: PolicySettings {
                strict: self.strict,
                permissive: self.permissive,
                allow_nulls: self.allow_nulls,
            },
            validation: ValidationSettings {
                check_hierarchies: self.check_hierarchies,
                report_unused_domain_values: self.unused_domain_values,
                detect_anomalies: self.detect_anomalies,
                segmentation: self.segment_by.clone(),
            },
            extractor: ExtractorConfig {
                view: self.view.clone(),
                schema: self.db_schema.clone(),
                file_path: None,
                minimise: self.minimise,
            },
            ..JobFile::default()
        }
    }
}

impl BuildArgs {
    pub fn to_job_file(&self) -> JobFile {
        JobFile {
            output_dir: self.output_dir.clone(),
            formats: self.formats.clone(),
            force: self.force,
            row_numbers: self.row_numbers,
            ..self.job.to_job_file()
        }
    }
}
