//! # rmstamp-core
//!
//! Stamps tablet stroke annotations onto the PDF they were drawn on.
//!
//! A bundle is a zip archive holding the original document plus one stroke
//! record per annotated page. This crate provides functionality to:
//! - Extract a bundle and locate its original document
//! - Resolve the page geometry from overrides or document metadata
//! - Turn each page's strokes into a styled vector overlay
//! - Assemble the overlays and stamp them onto the original
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use rmstamp_core::{Config, Pipeline, Toolchain};
//!
//! let config = Config::default();
//! let toolchain = Toolchain::system(&config.tools);
//! let pipeline = Pipeline::new(config, toolchain)?;
//!
//! let report = pipeline.run(Path::new("notes.zip"), Path::new("notes.pdf"))?;
//! println!("{} pages, {} annotated", report.page_count, report.annotated_pages.len());
//! # Ok::<(), rmstamp_core::RmError>(())
//! ```

pub mod archive;
pub mod assembler;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod stamper;
pub mod style;
pub mod svg;
pub mod toolchain;
pub mod tools;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use archive::{extract, DocumentBundle};
pub use assembler::{AssembledOverlay, PageAssembler};
pub use compositor::{AnnotationSource, OverlayPage, PageCompositor};
pub use config::{Config, PageSettings, RunSettings, StyleOptions, ToolsConfig, CONFIG_FILE_NAME};
pub use error::{Result, RmError};
pub use geometry::{GeometryResolver, PageGeometry};
pub use pipeline::{default_output_path, Pipeline, RunReport};
pub use stamper::{OutputDocument, Stamper};
pub use svg::{SvgDocument, SvgError};
pub use toolchain::{
    missing_programs, DocumentMerger, PageMetadataReader, StrokeRasterizer, ToolError, Toolchain,
    VectorRenderer,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
