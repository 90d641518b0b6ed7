//! In-memory stand-ins for the external toolchain
//!
//! The fakes model a "PDF" as a UTF-8 text file holding one line per page:
//!
//! - rendering writes the SVG as a single line,
//! - concatenation appends files,
//! - stamping joins line `i` of both inputs as `<base> | <overlay>`,
//! - page count is the number of lines.
//!
//! This is enough to drive the whole pipeline without `pdftk` and friends.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::geometry::PageGeometry;
use crate::style::{DEFAULT_INK, DEFAULT_STROKE_WIDTH};
use crate::svg::format_number;
use crate::toolchain::{
    DocumentMerger, PageMetadataReader, StrokeRasterizer, ToolError, ToolResult, Toolchain,
    VectorRenderer,
};

/// Knobs for injecting failures into the fakes
#[derive(Debug, Clone)]
pub struct FakeOptions {
    /// Value reported as the page-size description
    pub page_size: Option<String>,
    /// Make rasterizing this page fail
    pub fail_rasterize_page: Option<usize>,
    /// Make the merger lose the last page while concatenating
    pub drop_last_concatenated_page: bool,
    /// Set the flag once the renderer has produced this many pages
    pub cancel_after_renders: Option<(usize, Arc<AtomicBool>)>,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            page_size: Some("612 x 792 pts (letter)".to_string()),
            fail_rasterize_page: None,
            drop_last_concatenated_page: false,
            cancel_after_renders: None,
        }
    }
}

/// Record of calls made to the fakes
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    rasterized: Arc<Mutex<Vec<usize>>>,
    rendered: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeLog {
    /// Page indices passed to the rasterizer, sorted
    pub fn rasterized(&self) -> Vec<usize> {
        let mut pages = self.rasterized.lock().unwrap().clone();
        pages.sort_unstable();
        pages
    }

    /// Number of render calls
    pub fn rendered(&self) -> usize {
        self.rendered.lock().unwrap().len()
    }

    /// Output paths handed to the renderer, in call order
    pub fn rendered_paths(&self) -> Vec<PathBuf> {
        self.rendered.lock().unwrap().clone()
    }
}

/// Build a fake toolchain and a handle to its call log
pub fn fake_toolchain(options: FakeOptions) -> (Toolchain, FakeLog) {
    let log = FakeLog::default();
    let toolchain = Toolchain::new(
        Box::new(FakeRasterizer {
            fail_page: options.fail_rasterize_page,
            log: log.clone(),
        }),
        Box::new(FakeMetadata {
            page_size: options.page_size.clone(),
        }),
        Box::new(FakeRenderer {
            log: log.clone(),
            cancel_after: options.cancel_after_renders.clone(),
        }),
        Box::new(FakeMerger {
            drop_last: options.drop_last_concatenated_page,
        }),
    );
    (toolchain, log)
}

/// Write a bundle with `pages` original pages and strokes on `annotated`
///
/// The original is `<base>.pdf` with lines `original page <i>`; each stroke
/// record is `<base>/<i>.rm`.
pub fn write_bundle(dir: &Path, base: &str, pages: usize, annotated: &[usize]) -> PathBuf {
    let mut entries: Vec<(String, String)> = vec![(format!("{base}.pdf"), original_text(pages))];
    entries.push((format!("{base}.content"), "{}".to_string()));
    for page in annotated {
        entries.push((format!("{base}/{page}.rm"), format!("strokes {page}")));
    }
    write_zip(&dir.join(format!("{base}.zip")), &entries)
}

/// Write a zip archive from `(name, contents)` pairs
pub fn write_zip(path: &Path, entries: &[(String, String)]) -> PathBuf {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

/// Contents of a fake original with `pages` pages
pub fn original_text(pages: usize) -> String {
    (0..pages).map(|p| format!("original page {p}\n")).collect()
}

struct FakeRasterizer {
    fail_page: Option<usize>,
    log: FakeLog,
}

impl StrokeRasterizer for FakeRasterizer {
    fn name(&self) -> &str {
        "fake-rasterizer"
    }

    fn rasterize(&self, record: &Path, geometry: PageGeometry) -> ToolResult<String> {
        let page: usize = record
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| bad_output("fake-rasterizer", "record name is not a page index"))?;
        self.log.rasterized.lock().unwrap().push(page);

        if self.fail_page == Some(page) {
            return Err(ToolError::Failed {
                program: "fake-rasterizer".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("corrupt record {}", record.display()),
            });
        }

        let strokes = fs::read_to_string(record)?;
        Ok(format!(
            concat!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\">\n",
                "<g id=\"p1\" style=\"display:inline\">\n",
                "<polyline data-record=\"{r}\" style=\"fill:none;stroke:{ink};stroke-width:{sw};opacity:0\" points=\"1,1 2,2\"/>\n",
                "</g>\n",
                "</svg>\n"
            ),
            w = format_number(geometry.width),
            h = format_number(geometry.height),
            r = strokes.trim(),
            ink = DEFAULT_INK,
            sw = DEFAULT_STROKE_WIDTH,
        ))
    }
}

struct FakeMetadata {
    page_size: Option<String>,
}

impl PageMetadataReader for FakeMetadata {
    fn name(&self) -> &str {
        "fake-metadata"
    }

    fn page_count(&self, document: &Path) -> ToolResult<usize> {
        Ok(fs::read_to_string(document)?.lines().count())
    }

    fn page_size(&self, document: &Path) -> ToolResult<Option<String>> {
        if !document.is_file() {
            return Err(bad_output("fake-metadata", "document does not exist"));
        }
        Ok(self.page_size.clone())
    }
}

struct FakeRenderer {
    log: FakeLog,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl VectorRenderer for FakeRenderer {
    fn name(&self) -> &str {
        "fake-renderer"
    }

    fn render(&self, svg: &str, _geometry: PageGeometry, output: &Path) -> ToolResult<()> {
        let rendered = {
            let mut paths = self.log.rendered.lock().unwrap();
            paths.push(output.to_path_buf());
            paths.len()
        };
        let line = svg.split_whitespace().collect::<Vec<_>>().join(" ");
        fs::write(output, format!("{line}\n"))?;
        if let Some((after, flag)) = &self.cancel_after {
            if rendered >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

struct FakeMerger {
    drop_last: bool,
}

impl DocumentMerger for FakeMerger {
    fn name(&self) -> &str {
        "fake-merger"
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> ToolResult<()> {
        let mut lines = Vec::new();
        for input in inputs {
            lines.extend(fs::read_to_string(input)?.lines().map(str::to_string));
        }
        if self.drop_last {
            lines.pop();
        }
        fs::write(output, join_lines(&lines))?;
        Ok(())
    }

    fn stamp(&self, base: &Path, overlay: &Path, output: &Path) -> ToolResult<()> {
        let base = fs::read_to_string(base)?;
        let overlay = fs::read_to_string(overlay)?;
        let (base, overlay): (Vec<&str>, Vec<&str>) =
            (base.lines().collect(), overlay.lines().collect());
        if base.len() != overlay.len() {
            return Err(bad_output("fake-merger", "page counts differ"));
        }
        let lines: Vec<String> = base
            .iter()
            .zip(&overlay)
            .map(|(b, o)| format!("{b} | {o}"))
            .collect();
        fs::write(output, join_lines(&lines))?;
        Ok(())
    }
}

fn join_lines(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

fn bad_output(program: &str, message: &str) -> ToolError {
    ToolError::BadOutput {
        program: program.to_string(),
        message: message.to_string(),
    }
}
