//! Error types for rmstamp operations

use std::path::PathBuf;

use thiserror::Error;

use crate::svg::SvgError;
use crate::toolchain::ToolError;

/// Errors that can occur while stamping a bundle
#[derive(Error, Debug)]
pub enum RmError {
    /// The input bundle does not exist or is not a regular file
    #[error("Input bundle not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The archive does not contain exactly one top-level PDF
    #[error("Expected exactly one top-level PDF in the bundle, found {}: [{}]", .found.len(), .found.join(", "))]
    AmbiguousOrMissingSource { found: Vec<String> },

    /// No override and no parseable metadata for a page axis
    #[error("Page {axis} unavailable: no override given and metadata has no usable value")]
    GeometryUnavailable { axis: &'static str },

    /// Rasterizing, styling or rendering a page failed
    #[error("Conversion failed for page {page}: {source}")]
    ConversionFailed {
        page: usize,
        #[source]
        source: Box<RmError>,
    },

    /// The assembled overlay does not span the original page count
    #[error("Overlay page count mismatch: expected {expected}, got {actual}")]
    PageCountMismatch { expected: usize, actual: usize },

    /// Stamping the overlay onto the original failed
    #[error("Stamping failed: {0}")]
    StampFailed(String),

    /// The run was cancelled by an external interrupt
    #[error("Interrupted")]
    Interrupted,

    /// An option value is out of range
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Error reading the zip archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing or writing vector markup
    #[error("SVG error: {0}")]
    Svg(#[from] SvgError),

    /// An external collaborator failed
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl RmError {
    /// Wrap an error as a conversion failure for the given page
    pub fn conversion(page: usize, source: impl Into<RmError>) -> Self {
        RmError::ConversionFailed {
            page,
            source: Box::new(source.into()),
        }
    }
}

/// Result type for rmstamp operations
pub type Result<T> = std::result::Result<T, RmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RmError::AmbiguousOrMissingSource {
            found: vec!["a.pdf".to_string(), "b.pdf".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Expected exactly one top-level PDF in the bundle, found 2: [a.pdf, b.pdf]"
        );

        let err = RmError::PageCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Overlay page count mismatch: expected 3, got 2"
        );
    }

    #[test]
    fn test_conversion_wraps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = RmError::conversion(4, io_err);
        match err {
            RmError::ConversionFailed { page, source } => {
                assert_eq!(page, 4);
                assert!(matches!(*source, RmError::Io(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
