//! End-to-end orchestration
//!
//! ```text
//! bundle.zip ─► extract ─► page count ─► geometry ─► composite (0..n)
//!                                                        │
//!             output.pdf ◄─ publish ◄─ stamp ◄─ assemble ◄┘
//! ```
//!
//! The workspace is owned by the extracted bundle and disappears when
//! [`Pipeline::run`] returns, whatever the outcome.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::archive::{self, DocumentBundle};
use crate::assembler::PageAssembler;
use crate::compositor::PageCompositor;
use crate::config::Config;
use crate::error::{Result, RmError};
use crate::geometry::{GeometryResolver, PageGeometry};
use crate::stamper::Stamper;
use crate::toolchain::Toolchain;

const OVERLAY_FILE: &str = "overlay.pdf";
const STAMPED_FILE: &str = "stamped.pdf";

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Where the annotated document was written
    pub output: PathBuf,
    /// Pages in the original and in the output
    pub page_count: usize,
    /// Indices of pages that carried strokes
    pub annotated_pages: Vec<usize>,
    /// Page size used for every overlay
    pub geometry: PageGeometry,
}

/// Output path used when none is given: the bundle's stem with a `.pdf`
/// extension, in the working directory
pub fn default_output_path(bundle_path: &Path) -> PathBuf {
    let stem = bundle_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(format!("{stem}.pdf"))
}

/// Converts bundles into annotated documents
pub struct Pipeline {
    config: Config,
    toolchain: Toolchain,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    /// Create a pipeline, rejecting out-of-range configuration
    pub fn new(config: Config, toolchain: Toolchain) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            toolchain,
            cancel: None,
        })
    }

    /// Abort at the next checkpoint once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert `bundle_path` and write the result to `output`
    ///
    /// `output` is only created once stamping has succeeded; a failed or
    /// interrupted run leaves it untouched.
    pub fn run(&self, bundle_path: &Path, output: &Path) -> Result<RunReport> {
        log::info!("Extracting {}", bundle_path.display());
        let bundle = archive::extract(bundle_path)?;
        self.checkpoint()?;

        let report = self.convert(&bundle, output)?;
        log::info!(
            "Wrote {} ({} pages, {} annotated)",
            report.output.display(),
            report.page_count,
            report.annotated_pages.len()
        );
        Ok(report)
    }

    fn convert(&self, bundle: &DocumentBundle, output: &Path) -> Result<RunReport> {
        let original = bundle.original();
        let page_count = self.toolchain.metadata.page_count(original)?;
        if page_count == 0 {
            return Err(RmError::StampFailed(
                "original document has no pages".to_string(),
            ));
        }

        let geometry = GeometryResolver::new(self.toolchain.metadata.as_ref()).resolve(
            original,
            self.config.page.width,
            self.config.page.height,
        )?;
        log::info!(
            "{} pages at {} x {} pts",
            page_count,
            geometry.width,
            geometry.height
        );
        self.checkpoint()?;

        let scratch = bundle.scratch_dir()?;
        let mut compositor = PageCompositor::new(
            bundle,
            &self.toolchain,
            geometry,
            &self.config.style,
            page_count,
            &scratch,
        );
        if let Some(flag) = &self.cancel {
            compositor = compositor.with_cancellation(flag.as_ref());
        }
        let pages = compositor.composite_all(self.config.run.jobs)?;
        let annotated_pages: Vec<usize> = pages
            .iter()
            .filter(|p| p.annotated)
            .map(|p| p.index)
            .collect();
        log::debug!("Annotated pages: {annotated_pages:?}");
        self.checkpoint()?;

        log::info!("Assembling overlay");
        let overlay = PageAssembler::new(&self.toolchain).assemble(
            pages,
            page_count,
            &scratch.join(OVERLAY_FILE),
        )?;
        self.checkpoint()?;

        log::info!("Stamping overlay onto {}", bundle.base_id());
        let stamped = Stamper::new(&self.toolchain).stamp(
            original,
            &overlay,
            &scratch.join(STAMPED_FILE),
        )?;
        self.checkpoint()?;

        publish(&stamped.path, output)?;

        Ok(RunReport {
            output: output.to_path_buf(),
            page_count: stamped.page_count,
            annotated_pages,
            geometry,
        })
    }

    fn checkpoint(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(RmError::Interrupted),
            _ => Ok(()),
        }
    }
}

/// Copy `stamped` to `output` through a sibling temp file and rename
fn publish(stamped: &Path, output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut staged = NamedTempFile::new_in(&parent)?;
    io::copy(&mut File::open(stamped)?, staged.as_file_mut())?;
    staged.persist(output).map_err(|e| RmError::Io(e.error))?;
    log::debug!("Published {}", output.display());
    Ok(())
}
