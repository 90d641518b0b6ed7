//! Overlay assembly
//!
//! Concatenates the per-page overlays into one document that lines up page
//! for page with the original.

use std::path::{Path, PathBuf};

use crate::compositor::OverlayPage;
use crate::error::{Result, RmError};
use crate::toolchain::Toolchain;

/// The concatenated overlay document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledOverlay {
    pub path: PathBuf,
    pub page_count: usize,
}

/// Concatenates overlay pages in index order
pub struct PageAssembler<'a> {
    toolchain: &'a Toolchain,
}

impl<'a> PageAssembler<'a> {
    pub fn new(toolchain: &'a Toolchain) -> Self {
        Self { toolchain }
    }

    /// Concatenate `pages` into `output`
    ///
    /// `pages` may arrive in any order; they are sorted by index first. The
    /// set of indices must be exactly `0..expected`, and the concatenated
    /// document must report `expected` pages.
    pub fn assemble(
        &self,
        mut pages: Vec<OverlayPage>,
        expected: usize,
        output: &Path,
    ) -> Result<AssembledOverlay> {
        pages.sort_by_key(|p| p.index);

        let contiguous = pages.iter().enumerate().all(|(i, p)| p.index == i);
        if pages.len() != expected || !contiguous {
            return Err(RmError::PageCountMismatch {
                expected,
                actual: pages.len(),
            });
        }

        let inputs: Vec<PathBuf> = pages.into_iter().map(|p| p.path).collect();
        log::debug!("Concatenating {} overlay pages", inputs.len());
        self.toolchain.merger.concatenate(&inputs, output)?;

        let actual = self.toolchain.metadata.page_count(output)?;
        if actual != expected {
            return Err(RmError::PageCountMismatch { expected, actual });
        }

        Ok(AssembledOverlay {
            path: output.to_path_buf(),
            page_count: actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_toolchain, FakeOptions};
    use tempfile::TempDir;

    fn page(dir: &Path, index: usize) -> OverlayPage {
        let path = dir.join(format!("overlay-{index}.pdf"));
        std::fs::write(&path, format!("overlay {index}\n")).unwrap();
        OverlayPage {
            index,
            path,
            annotated: false,
        }
    }

    #[test]
    fn test_assembles_in_index_order() {
        let dir = TempDir::new().unwrap();
        let (toolchain, _) = fake_toolchain(FakeOptions::default());
        let pages = vec![page(dir.path(), 2), page(dir.path(), 0), page(dir.path(), 1)];
        let output = dir.path().join("overlay.pdf");

        let assembled = PageAssembler::new(&toolchain)
            .assemble(pages, 3, &output)
            .unwrap();

        assert_eq!(assembled.page_count, 3);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "overlay 0\noverlay 1\noverlay 2\n"
        );
    }

    #[test]
    fn test_missing_page_is_mismatch() {
        let dir = TempDir::new().unwrap();
        let (toolchain, _) = fake_toolchain(FakeOptions::default());
        let pages = vec![page(dir.path(), 0), page(dir.path(), 2)];

        let err = PageAssembler::new(&toolchain)
            .assemble(pages, 3, &dir.path().join("overlay.pdf"))
            .unwrap_err();
        assert!(matches!(
            err,
            RmError::PageCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_gap_in_indices_is_mismatch() {
        let dir = TempDir::new().unwrap();
        let (toolchain, _) = fake_toolchain(FakeOptions::default());
        let pages = vec![page(dir.path(), 0), page(dir.path(), 2)];

        let err = PageAssembler::new(&toolchain)
            .assemble(pages, 2, &dir.path().join("overlay.pdf"))
            .unwrap_err();
        assert!(matches!(err, RmError::PageCountMismatch { .. }));
    }

    #[test]
    fn test_merger_dropping_pages_is_detected() {
        let dir = TempDir::new().unwrap();
        let (toolchain, _) = fake_toolchain(FakeOptions {
            drop_last_concatenated_page: true,
            ..FakeOptions::default()
        });
        let pages = vec![page(dir.path(), 0), page(dir.path(), 1)];

        let err = PageAssembler::new(&toolchain)
            .assemble(pages, 2, &dir.path().join("overlay.pdf"))
            .unwrap_err();
        assert!(matches!(
            err,
            RmError::PageCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
