//! Renderer capability and the format registry.

use std::collections::BTreeMap;
use std::io::Write;

use dex_model::{CanonicalTable, OutputFormat};

use crate::error::RenderError;
use crate::renderers::{CsvRenderer, InfoRenderer, JsonRenderer, TdsxRenderer, XlsxRenderer};

/// Serializes a canonical table in one output format.
pub trait Renderer {
    fn format(&self) -> OutputFormat;

    /// File extension, without the dot.
    fn extension(&self) -> &str {
        self.format().extension()
    }

    fn render(&self, table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError>;
}

/// Maps output formats to renderers.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: BTreeMap<OutputFormat, Box<dyn Renderer>>,
}

impl RendererRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every bundled renderer.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CsvRenderer::default());
        registry.register(XlsxRenderer);
        registry.register(InfoRenderer::default());
        registry.register(TdsxRenderer);
        registry.register(JsonRenderer::default());
        registry
    }

    /// Add a renderer, replacing any registered for the same format.
    pub fn register(&mut self, renderer: impl Renderer + 'static) {
        self.renderers.insert(renderer.format(), Box::new(renderer));
    }

    pub fn get(&self, format: OutputFormat) -> Option<&dyn Renderer> {
        self.renderers.get(&format).map(Box::as_ref)
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        self.renderers.contains_key(&format)
    }

    pub fn formats(&self) -> impl Iterator<Item = OutputFormat> + '_ {
        self.renderers.keys().copied()
    }
}
