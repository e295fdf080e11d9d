pub mod json;
pub mod svg;

pub use json::JsonRenderer;
pub use svg::SvgRenderer;

use crate::chart::ChartRenderer;
use anyhow::Result;
use std::path::Path;

/// Output formats the report can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Static SVG charts
    Svg,
    /// JSON datasets for an interactive dashboard
    Json,
}

/// Construct the renderer for `format`, writing into `output_dir`.
pub fn renderer_for(format: OutputFormat, output_dir: &Path) -> Result<Box<dyn ChartRenderer>> {
    Ok(match format {
        OutputFormat::Svg => Box::new(SvgRenderer::new(output_dir)?),
        OutputFormat::Json => Box::new(JsonRenderer::new(output_dir)?),
    })
}
