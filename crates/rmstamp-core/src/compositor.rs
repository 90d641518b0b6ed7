//! Per-page overlay generation
//!
//! Every page of the original gets exactly one single-page overlay PDF:
//! a styled rendering of its stroke record when one exists, otherwise a
//! transparent blank of the same size.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::archive::DocumentBundle;
use crate::config::StyleOptions;
use crate::error::{Result, RmError};
use crate::geometry::PageGeometry;
use crate::style;
use crate::svg::SvgDocument;
use crate::toolchain::Toolchain;

/// Whether a page has a stroke record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSource {
    Present(PathBuf),
    Absent,
}

impl AnnotationSource {
    /// Look in the workspace for the stroke record of `page`
    pub fn locate(bundle: &DocumentBundle, page: usize) -> Self {
        let record = bundle.stroke_record_path(page);
        if record.is_file() {
            AnnotationSource::Present(record)
        } else {
            AnnotationSource::Absent
        }
    }
}

/// One single-page overlay artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayPage {
    pub index: usize,
    pub path: PathBuf,
    /// `true` when built from a stroke record, `false` for a blank filler
    pub annotated: bool,
}

/// Digits needed so lexical order of page names equals numeric order
pub fn index_width(page_count: usize) -> usize {
    page_count.max(1).to_string().len()
}

/// File name of the overlay artifact for `page`
pub fn overlay_file_name(page: usize, page_count: usize) -> String {
    format!("overlay-{page:0width$}.pdf", width = index_width(page_count))
}

/// Builds overlay pages for one bundle
pub struct PageCompositor<'a> {
    bundle: &'a DocumentBundle,
    toolchain: &'a Toolchain,
    geometry: PageGeometry,
    style: &'a StyleOptions,
    page_count: usize,
    out_dir: &'a Path,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> PageCompositor<'a> {
    pub fn new(
        bundle: &'a DocumentBundle,
        toolchain: &'a Toolchain,
        geometry: PageGeometry,
        style: &'a StyleOptions,
        page_count: usize,
        out_dir: &'a Path,
    ) -> Self {
        Self {
            bundle,
            toolchain,
            geometry,
            style,
            page_count,
            out_dir,
            cancel: None,
        }
    }

    /// Stop before the next page once `flag` is set
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Build the overlay for a single page
    pub fn composite(&self, page: usize) -> Result<OverlayPage> {
        let output = self
            .out_dir
            .join(overlay_file_name(page, self.page_count));

        let annotated = match AnnotationSource::locate(self.bundle, page) {
            AnnotationSource::Present(record) => {
                log::debug!("Page {page}: rasterizing {}", record.display());
                let markup = self
                    .toolchain
                    .rasterizer
                    .rasterize(&record, self.geometry)
                    .map_err(|e| RmError::conversion(page, e))?;
                let styled = style::apply(&markup, self.geometry, self.style)
                    .map_err(|e| RmError::conversion(page, e))?;
                self.render(page, &styled, &output)?;
                true
            }
            AnnotationSource::Absent => {
                log::debug!("Page {page}: no strokes, using blank overlay");
                let blank = SvgDocument::blank(self.geometry.width, self.geometry.height)
                    .to_markup()
                    .map_err(|e| RmError::conversion(page, e))?;
                self.render(page, &blank, &output)?;
                false
            }
        };

        Ok(OverlayPage {
            index: page,
            path: output,
            annotated,
        })
    }

    /// Build overlays for every page, in index order
    ///
    /// With `jobs > 1` pages are built on a dedicated thread pool. The result
    /// order never depends on completion order, and the first failure aborts
    /// the whole batch.
    pub fn composite_all(&self, jobs: usize) -> Result<Vec<OverlayPage>> {
        if jobs <= 1 {
            return (0..self.page_count)
                .map(|page| self.checked_composite(page))
                .collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| RmError::InvalidOption(format!("cannot start {jobs} workers: {e}")))?;
        pool.install(|| {
            (0..self.page_count)
                .into_par_iter()
                .map(|page| self.checked_composite(page))
                .collect()
        })
    }

    fn checked_composite(&self, page: usize) -> Result<OverlayPage> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return Err(RmError::Interrupted);
        }
        self.composite(page)
    }

    fn render(&self, page: usize, svg: &str, output: &Path) -> Result<()> {
        self.toolchain
            .renderer
            .render(svg, self.geometry, output)
            .map_err(|e| RmError::conversion(page, e))
    }
}
