//! External collaborator interfaces
//!
//! Each heavyweight converter the pipeline depends on sits behind a narrow
//! trait so the pipeline can run against the system programs in production
//! and against fakes in tests.
//!
//! ```text
//! ┌──────────────────────┬─────────────────────────────────────────┐
//! │ Trait                │ Default implementation                  │
//! ├──────────────────────┼─────────────────────────────────────────┤
//! │ StrokeRasterizer     │ CommandRasterizer  (rM2svg)             │
//! │ PageMetadataReader   │ PdfInfoReader      (pdfinfo)            │
//! │ VectorRenderer       │ CommandRenderer    (rsvg-convert)       │
//! │ DocumentMerger       │ PdftkMerger        (pdftk)              │
//! └──────────────────────┴─────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::geometry::PageGeometry;
use crate::tools::{
    program_on_path, CommandRasterizer, CommandRenderer, PdfInfoReader, PdftkMerger,
};

/// Errors reported by external collaborators
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The program's output could not be interpreted
    #[error("Unexpected output from {program}: {message}")]
    BadOutput { program: String, message: String },

    /// I/O error around the invocation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for collaborator calls
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Converts one stroke record into SVG markup sized to the page
pub trait StrokeRasterizer: Send + Sync {
    /// Human-readable name of this rasterizer
    fn name(&self) -> &str;

    /// Rasterize `record` to SVG markup at `geometry`
    ///
    /// The markup is expected to contain stroke elements authored at zero
    /// opacity with the default ink color and stroke width.
    fn rasterize(&self, record: &Path, geometry: PageGeometry) -> ToolResult<String>;
}

/// Reads page count and page size from a PDF
pub trait PageMetadataReader: Send + Sync {
    fn name(&self) -> &str;

    /// Number of pages in `document`
    fn page_count(&self, document: &Path) -> ToolResult<usize>;

    /// Raw page-size description, e.g. `612 x 792 pts (letter)`
    ///
    /// Returns `None` when the document carries no size information.
    fn page_size(&self, document: &Path) -> ToolResult<Option<String>>;
}

/// Renders SVG markup to a single-page PDF
pub trait VectorRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Render `svg` at `geometry` into `output`
    fn render(&self, svg: &str, geometry: PageGeometry, output: &Path) -> ToolResult<()>;
}

/// Concatenates and stamps PDFs
pub trait DocumentMerger: Send + Sync {
    fn name(&self) -> &str;

    /// Concatenate `inputs`, in order, into `output`
    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> ToolResult<()>;

    /// Stamp page `i` of `overlay` onto page `i` of `base` for every page
    fn stamp(&self, base: &Path, overlay: &Path, output: &Path) -> ToolResult<()>;
}

/// The set of collaborators one pipeline run uses
pub struct Toolchain {
    pub rasterizer: Box<dyn StrokeRasterizer>,
    pub metadata: Box<dyn PageMetadataReader>,
    pub renderer: Box<dyn VectorRenderer>,
    pub merger: Box<dyn DocumentMerger>,
}

impl Toolchain {
    /// Assemble a toolchain from arbitrary implementations
    pub fn new(
        rasterizer: Box<dyn StrokeRasterizer>,
        metadata: Box<dyn PageMetadataReader>,
        renderer: Box<dyn VectorRenderer>,
        merger: Box<dyn DocumentMerger>,
    ) -> Self {
        Self {
            rasterizer,
            metadata,
            renderer,
            merger,
        }
    }

    /// Toolchain backed by the configured system programs
    pub fn system(tools: &ToolsConfig) -> Self {
        log::debug!(
            "Using system toolchain: {}, {}, {}, {}",
            tools.rasterizer,
            tools.metadata,
            tools.renderer,
            tools.merger
        );
        Self::new(
            Box::new(CommandRasterizer::new(&tools.rasterizer)),
            Box::new(PdfInfoReader::new(&tools.metadata)),
            Box::new(CommandRenderer::new(&tools.renderer)),
            Box::new(PdftkMerger::new(&tools.merger)),
        )
    }

    /// Names of the collaborators, in pipeline order
    pub fn names(&self) -> [&str; 4] {
        [
            self.rasterizer.name(),
            self.metadata.name(),
            self.renderer.name(),
            self.merger.name(),
        ]
    }
}

/// Report which configured programs cannot be found on `PATH`
pub fn missing_programs(tools: &ToolsConfig) -> Vec<String> {
    [
        &tools.rasterizer,
        &tools.metadata,
        &tools.renderer,
        &tools.merger,
    ]
    .into_iter()
    .filter(|program| !program_on_path(program))
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_toolchain_names() {
        let toolchain = Toolchain::system(&ToolsConfig::default());
        assert_eq!(
            toolchain.names(),
            ["rM2svg", "pdfinfo", "rsvg-convert", "pdftk"]
        );
    }

    #[test]
    fn test_missing_programs_reports_unknown() {
        let tools = ToolsConfig {
            rasterizer: "rmstamp-no-such-rasterizer".to_string(),
            ..ToolsConfig::default()
        };
        let missing = missing_programs(&tools);
        assert!(missing.contains(&"rmstamp-no-such-rasterizer".to_string()));
    }

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::Failed {
            program: "pdftk".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "Error: Unable to find file.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "pdftk exited with exit status: 1: Error: Unable to find file."
        );
    }
}
