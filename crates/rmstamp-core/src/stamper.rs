//! Stamping the overlay onto the original

use std::path::{Path, PathBuf};

use crate::assembler::AssembledOverlay;
use crate::error::{Result, RmError};
use crate::toolchain::Toolchain;

/// The stamped result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

/// Merges an overlay onto the original, page by page
pub struct Stamper<'a> {
    toolchain: &'a Toolchain,
}

impl<'a> Stamper<'a> {
    pub fn new(toolchain: &'a Toolchain) -> Self {
        Self { toolchain }
    }

    /// Stamp page `i` of `overlay` over page `i` of `original` into `output`
    pub fn stamp(
        &self,
        original: &Path,
        overlay: &AssembledOverlay,
        output: &Path,
    ) -> Result<OutputDocument> {
        let metadata = &self.toolchain.metadata;
        let original_pages = metadata.page_count(original)?;
        let overlay_pages = metadata.page_count(&overlay.path)?;
        if original_pages != overlay_pages {
            return Err(RmError::StampFailed(format!(
                "original has {original_pages} pages but overlay has {overlay_pages}"
            )));
        }

        log::debug!("Stamping {} pages", original_pages);
        self.toolchain
            .merger
            .stamp(original, &overlay.path, output)
            .map_err(|e| RmError::StampFailed(e.to_string()))?;

        Ok(OutputDocument {
            path: output.to_path_buf(),
            page_count: original_pages,
        })
    }
}
