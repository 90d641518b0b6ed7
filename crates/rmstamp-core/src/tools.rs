//! Command-backed collaborators
//!
//! These call the system programs directly rather than linking PDF or
//! rendering libraries, so the binary has no native build requirements.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::geometry::PageGeometry;
use crate::svg::format_number;
use crate::toolchain::{
    DocumentMerger, PageMetadataReader, StrokeRasterizer, ToolError, ToolResult, VectorRenderer,
};

/// Whether `program` resolves to an executable file
pub fn program_on_path(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let full = dir.join(program);
        full.is_file() || (cfg!(windows) && full.with_extension("exe").is_file())
    })
}

/// Run a command to completion, turning a non-zero exit into an error
fn run(program: &str, cmd: &mut Command) -> ToolResult<Output> {
    log::debug!("Running {:?}", cmd);
    let out = cmd.output().map_err(|source| ToolError::Spawn {
        program: program.to_string(),
        source,
    })?;
    if !out.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: out.status.to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(out)
}

/// Rasterizer invoking `rM2svg`
pub struct CommandRasterizer {
    program: String,
}

impl CommandRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl StrokeRasterizer for CommandRasterizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn rasterize(&self, record: &Path, geometry: PageGeometry) -> ToolResult<String> {
        let svg_path = record.with_extension("svg");
        run(
            &self.program,
            Command::new(&self.program)
                .arg("--input")
                .arg(record)
                .arg("--output")
                .arg(&svg_path)
                .arg("--width")
                .arg(format_number(geometry.width))
                .arg("--height")
                .arg(format_number(geometry.height)),
        )?;
        Ok(std::fs::read_to_string(&svg_path)?)
    }
}

/// Metadata reader invoking `pdfinfo`
pub struct PdfInfoReader {
    program: String,
}

impl PdfInfoReader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn info(&self, document: &Path) -> ToolResult<String> {
        let out = run(&self.program, Command::new(&self.program).arg(document))?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl PageMetadataReader for PdfInfoReader {
    fn name(&self) -> &str {
        &self.program
    }

    fn page_count(&self, document: &Path) -> ToolResult<usize> {
        let info = self.info(document)?;
        let value = info_field(&info, "Pages").ok_or_else(|| ToolError::BadOutput {
            program: self.program.clone(),
            message: "no Pages field".to_string(),
        })?;
        value.parse().map_err(|_| ToolError::BadOutput {
            program: self.program.clone(),
            message: format!("invalid page count '{value}'"),
        })
    }

    fn page_size(&self, document: &Path) -> ToolResult<Option<String>> {
        let info = self.info(document)?;
        Ok(info_field(&info, "Page size").map(str::to_string))
    }
}

/// Value of a `Key: value` line in pdfinfo output
pub fn info_field<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    info.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim())
    })
}

/// Renderer invoking `rsvg-convert`
pub struct CommandRenderer {
    program: String,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl VectorRenderer for CommandRenderer {
    fn name(&self) -> &str {
        &self.program
    }

    fn render(&self, svg: &str, geometry: PageGeometry, output: &Path) -> ToolResult<()> {
        let svg_path = output.with_extension("svg");
        std::fs::write(&svg_path, svg)?;
        run(
            &self.program,
            Command::new(&self.program)
                .args(["--format", "pdf", "--dpi-x", "72", "--dpi-y", "72"])
                .arg("--width")
                .arg(format_number(geometry.width))
                .arg("--height")
                .arg(format_number(geometry.height))
                .arg("--output")
                .arg(output)
                .arg(&svg_path),
        )?;
        Ok(())
    }
}

/// Merger invoking `pdftk`
pub struct PdftkMerger {
    program: String,
}

impl PdftkMerger {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DocumentMerger for PdftkMerger {
    fn name(&self) -> &str {
        &self.program
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> ToolResult<()> {
        run(
            &self.program,
            Command::new(&self.program)
                .args(inputs)
                .args(["cat", "output"])
                .arg(output),
        )?;
        Ok(())
    }

    fn stamp(&self, base: &Path, overlay: &Path, output: &Path) -> ToolResult<()> {
        run(
            &self.program,
            Command::new(&self.program)
                .arg(base)
                .arg("multistamp")
                .arg(overlay)
                .arg("output")
                .arg(output),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDFINFO: &str = "Title:          Notes\n\
Producer:       Skia/PDF m80\n\
Pages:          3\n\
Encrypted:      no\n\
Page size:      612 x 792 pts (letter)\n\
Page rot:       0\n";

    #[test]
    fn test_info_field() {
        assert_eq!(info_field(PDFINFO, "Pages"), Some("3"));
        assert_eq!(
            info_field(PDFINFO, "Page size"),
            Some("612 x 792 pts (letter)")
        );
        assert_eq!(info_field(PDFINFO, "Page"), None);
        assert_eq!(info_field(PDFINFO, "Author"), None);
    }

    #[test]
    fn test_program_on_path_with_explicit_path() {
        assert!(!program_on_path("/definitely/not/here/pdftk"));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let reader = PdfInfoReader::new("rmstamp-no-such-pdfinfo");
        let err = reader.page_count(Path::new("missing.pdf")).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(err.to_string().contains("rmstamp-no-such-pdfinfo"));
    }
}
