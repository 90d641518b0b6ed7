//! Bundle extraction
//!
//! A bundle is a zip archive holding the original PDF at its top level and
//! one stroke record per annotated page under a directory named after the
//! PDF's stem:
//!
//! ```text
//! notes.zip
//! ├── 3f2a….pdf
//! ├── 3f2a….content
//! └── 3f2a…/
//!     ├── 0.rm
//!     └── 4.rm
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::read::ZipArchive;

use crate::error::{Result, RmError};

/// Extension of the per-page stroke record files
pub const STROKE_RECORD_EXTENSION: &str = "rm";

/// Prefix of the ephemeral workspace directory
const WORKSPACE_PREFIX: &str = "rmstamp-";

/// An extracted bundle
///
/// Owns the workspace directory; dropping the bundle deletes it together
/// with every artifact produced during the run.
#[derive(Debug)]
pub struct DocumentBundle {
    archive_path: PathBuf,
    workspace: TempDir,
    original: PathBuf,
    base_id: String,
}

impl DocumentBundle {
    /// Path of the archive this bundle was extracted from
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Root of the ephemeral workspace
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    /// The original PDF inside the workspace
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// File stem of the original PDF
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Location the stroke record for `page` would have
    pub fn stroke_record_path(&self, page: usize) -> PathBuf {
        self.workspace()
            .join(&self.base_id)
            .join(format!("{page}.{STROKE_RECORD_EXTENSION}"))
    }

    /// Directory for intermediate artifacts, created on demand
    pub fn scratch_dir(&self) -> Result<PathBuf> {
        let dir = self.workspace().join(".rmstamp");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Extract `bundle_path` into a fresh workspace and locate the original PDF
///
/// The original is the single regular file directly in the archive root whose
/// extension is `pdf` (ASCII case-insensitive). PDFs in nested directories are
/// never considered.
pub fn extract(bundle_path: &Path) -> Result<DocumentBundle> {
    if !bundle_path.is_file() {
        return Err(RmError::NotFound(bundle_path.to_path_buf()));
    }

    let workspace = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir()?;
    log::debug!(
        "Extracting {} into {}",
        bundle_path.display(),
        workspace.path().display()
    );

    let mut archive = ZipArchive::new(File::open(bundle_path)?)?;
    archive.extract(workspace.path())?;

    let original = find_original(workspace.path())?;
    let base_id = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::info!("Original document: {}", file_name(&original));
    for name in unexpected_entries(workspace.path(), &base_id)? {
        log::warn!("Ignoring unexpected bundle entry: {name}");
    }

    Ok(DocumentBundle {
        archive_path: bundle_path.to_path_buf(),
        workspace,
        original,
        base_id,
    })
}

fn find_original(root: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            candidates.push(path);
        }
    }
    candidates.sort();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        _ => Err(RmError::AmbiguousOrMissingSource {
            found: candidates.iter().map(|p| file_name(p)).collect(),
        }),
    }
}

/// Top-level entries that do not belong to the original document
///
/// Companion files share the original's stem (`<base>.content`,
/// `<base>.metadata`, the `<base>/` record directory); anything else is
/// carried along but never read.
fn unexpected_entries(root: &Path, base_id: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let stem = path.file_stem().map(|s| s.to_string_lossy());
        if stem.as_deref() != Some(base_id) {
            names.push(file_name(&path));
        }
    }
    names.sort();
    Ok(names)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
