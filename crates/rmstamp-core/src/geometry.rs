//! Page geometry resolution
//!
//! Every page of a bundle is assumed to share one size. The size comes from
//! explicit overrides when given, otherwise from the original document's
//! page-size metadata.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, RmError};
use crate::toolchain::PageMetadataReader;

/// Page width and height in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    /// Create a geometry, rejecting non-positive or non-finite sides
    pub fn new(width: f64, height: f64) -> Result<Self> {
        for (axis, value) in [("width", width), ("height", height)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(RmError::InvalidOption(format!(
                    "page {axis} must be a positive number, got {value}"
                )));
            }
        }
        Ok(Self { width, height })
    }
}

/// Extract the first two numeric tokens of a page-size description
///
/// Unit labels and paper names are ignored, so `612 x 792 pts (letter)` and
/// `595.276 x 841.89 pts (A4)` both parse.
pub fn parse_page_size(description: &str) -> Option<(f64, f64)> {
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER_RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

    let mut numbers = re
        .find_iter(description)
        .filter_map(|m| m.as_str().parse::<f64>().ok());
    let width = numbers.next()?;
    let height = numbers.next()?;
    Some((width, height))
}

/// Resolves page geometry from overrides and document metadata
pub struct GeometryResolver<'a> {
    metadata: &'a dyn PageMetadataReader,
}

impl<'a> GeometryResolver<'a> {
    pub fn new(metadata: &'a dyn PageMetadataReader) -> Self {
        Self { metadata }
    }

    /// Resolve the page size of `document`
    ///
    /// Overrides win per axis. Metadata is only queried when at least one
    /// axis has no override.
    pub fn resolve(
        &self,
        document: &Path,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<PageGeometry> {
        if let (Some(w), Some(h)) = (width, height) {
            log::debug!("Using page size overrides {w} x {h}");
            return PageGeometry::new(w, h);
        }

        let description = self.metadata.page_size(document)?;
        let parsed = description.as_deref().and_then(parse_page_size);
        if parsed.is_none() {
            log::warn!(
                "Could not read a page size from {} (got {:?})",
                document.display(),
                description
            );
        }

        let width = width
            .or(parsed.map(|(w, _)| w))
            .ok_or(RmError::GeometryUnavailable { axis: "width" })?;
        let height = height
            .or(parsed.map(|(_, h)| h))
            .ok_or(RmError::GeometryUnavailable { axis: "height" })?;

        log::debug!("Resolved page size {width} x {height}");
        PageGeometry::new(width, height)
    }
}
