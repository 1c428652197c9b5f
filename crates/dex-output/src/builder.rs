//! Building output artifacts from an extracted dataset.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info, warn};

use dex_extract::DataExtractor;
use dex_model::{CanonicalTable, OutputFormat};

use crate::error::{BuildError, RenderError, Result};
use crate::projection::project;
use crate::renderer::{Renderer, RendererRegistry};

/// Options applied to every build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Build even when validation found fatal issues.
    pub force: bool,
    /// Prepend a 1-based `Row` column.
    pub include_row_numbers: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_row_numbers(mut self, include: bool) -> Self {
        self.include_row_numbers = include;
        self
    }
}

/// What a successful build wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub rows: usize,
    pub bytes: u64,
    /// The data had fatal issues and the build was forced.
    pub forced: bool,
}

/// Turns one extracted dataset into files.
///
/// Rows are fetched and validated once by the owned [`DataExtractor`]; each
/// [`build`](Self::build) re-projects the cached rows and renders them.
pub struct DatasetBuilder {
    extractor: DataExtractor,
    registry: RendererRegistry,
    options: BuildOptions,
}

impl DatasetBuilder {
    pub fn new(extractor: DataExtractor) -> Self {
        Self {
            extractor,
            registry: RendererRegistry::with_defaults(),
            options: BuildOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: RendererRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add or replace the renderer for its format.
    pub fn register(&mut self, renderer: impl Renderer + 'static) {
        self.registry.register(renderer);
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn extractor(&self) -> &DataExtractor {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut DataExtractor {
        &mut self.extractor
    }

    /// Dataset columns the schema does not define.
    pub fn missing_metadata(&self) -> Vec<String> {
        let schema = self.extractor.schema();
        self.extractor
            .spec()
            .columns()
            .filter(|name| !schema.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Check that every dataset column is described by the schema.
    pub fn validate_metadata(&self) -> bool {
        let dataset = self.extractor.spec().name();
        let missing = self.missing_metadata();
        if missing.is_empty() {
            info!(dataset, "all metadata present");
            true
        } else {
            error!(dataset, missing = ?missing, "some metadata is missing");
            false
        }
    }

    /// Extract if needed and project the rows into a canonical table.
    ///
    /// Fails with [`BuildError::Validation`] when the data has fatal issues
    /// and the build is not forced.
    pub fn table(&mut self) -> Result<CanonicalTable> {
        self.check_quality()?;
        self.project_rows()
    }

    fn project_rows(&self) -> Result<CanonicalTable> {
        let extractor = &self.extractor;
        let rows = extractor.rows().unwrap_or_default();
        let table = project(
            extractor.schema(),
            extractor.spec(),
            rows,
            self.options.include_row_numbers,
        )?;
        Ok(table)
    }

    /// Write the dataset to `path` in `format`.
    ///
    /// Nothing is written unless rendering completes.
    pub fn build(&mut self, path: &Path, format: OutputFormat) -> Result<BuildOutput> {
        let start = Instant::now();
        if !self.registry.supports(format) {
            return Err(BuildError::UnsupportedFormat { format });
        }
        let forced = !self.check_quality()?;
        let table = self.project_rows()?;
        let renderer = self
            .registry
            .get(format)
            .ok_or(BuildError::UnsupportedFormat { format })?;

        let bytes = write_atomically(path, |writer| renderer.render(&table, writer))?;
        info!(
            dataset = %table.name(),
            format = %format,
            path = %path.display(),
            rows = table.row_count(),
            bytes,
            duration_ms = start.elapsed().as_millis(),
            "dataset built"
        );
        Ok(BuildOutput {
            path: path.to_path_buf(),
            format,
            rows: table.row_count(),
            bytes,
            forced,
        })
    }

    /// Build into `dir` under the conventional file name for `format`.
    pub fn build_into(&mut self, dir: &Path, format: OutputFormat) -> Result<BuildOutput> {
        let path = dir.join(default_file_name(self.extractor.spec().name(), format));
        self.build(&path, format)
    }

    /// `Ok(true)` when the data is usable, `Ok(false)` when it is not but the
    /// build is forced.
    fn check_quality(&mut self) -> Result<bool> {
        if self.extractor.validate_data()? {
            return Ok(true);
        }
        let policy = self.extractor.policy();
        let (fatal, warnings) = self
            .extractor
            .report()
            .map_or((0, 0), |r| (r.fatal_count(policy), r.warning_count(policy)));
        let dataset = self.extractor.spec().name().to_string();
        if self.options.force {
            warn!(dataset = %dataset, fatal, warnings, "building despite fatal issues");
            Ok(false)
        } else {
            Err(BuildError::Validation {
                dataset,
                fatal,
                warnings,
            })
        }
    }
}

/// File name used by [`DatasetBuilder::build_into`].
///
/// The info sheet shares the workbook extension, so it gets a suffix.
pub fn default_file_name(dataset: &str, format: OutputFormat) -> String {
    let stem = file_stem(dataset);
    match format {
        OutputFormat::Info => format!("{stem}-info.{}", format.extension()),
        _ => format!("{stem}.{}", format.extension()),
    }
}

/// A file name derived from a dataset name.
pub(crate) fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim();
    if stem.is_empty() {
        "data".to_string()
    } else {
        stem.to_string()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Io { path, source }
}

/// Render into a sibling temp file, then rename it over `path`.
fn write_atomically<F>(path: &Path, render: F) -> Result<u64>
where
    F: FnOnce(&mut dyn Write) -> std::result::Result<(), RenderError>,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let file_name = path
        .file_name()
        .map_or_else(|| "output".into(), |name| name.to_string_lossy());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let file = File::create(&temp_path).map_err(io_error(&temp_path))?;
    let mut writer = BufWriter::new(file);
    let written = render(&mut writer)
        .map_err(BuildError::from)
        .and_then(|()| writer.flush().map_err(io_error(&temp_path)))
        .and_then(|()| {
            writer
                .get_ref()
                .sync_all()
                .map_err(io_error(&temp_path))
        });
    drop(writer);
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, path).map_err(io_error(path))?;
    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    Ok(bytes)
}
