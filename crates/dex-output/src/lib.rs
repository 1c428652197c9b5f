//! Output generation for extracted datasets.
//!
//! A [`DatasetBuilder`] projects validated rows into a [`CanonicalTable`] and
//! hands it to the [`Renderer`] registered for the requested format:
//!
//! - **csv**: flat file
//! - **xlsx**: workbook with `Notes`, a `Pivot` table and the `Data` it reads
//! - **info**: the `Notes` sheet alone, to accompany a flat file
//! - **tdsx**: packaged BI datasource (definition plus CSV data)
//! - **json**: array of records
//!
//! [`CanonicalTable`]: dex_model::CanonicalTable

mod builder;
pub mod error;
pub mod projection;
mod renderer;
pub mod renderers;
mod split;
mod xml;

pub use builder::{BuildOptions, BuildOutput, DatasetBuilder, default_file_name};
pub use error::{BuildError, RenderError, Result, SplitError};
pub use projection::{ROW_NUMBER_COLUMN, project};
pub use renderer::{Renderer, RendererRegistry};
pub use renderers::{CsvRenderer, InfoRenderer, JsonRenderer, TdsxRenderer, XlsxRenderer};
pub use split::{DatasetSplitter, SplitSummary};
