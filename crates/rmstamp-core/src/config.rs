//! Run configuration
//!
//! A single immutable value built once from the config file and command-line
//! flags, then threaded through every pipeline component.
//!
//! # Configuration File
//!
//! ```toml
//! [style]
//! color = "red"
//! stroke_width = 2.0
//! margin_highlight = true
//! paling = false
//!
//! [page]
//! width = 612.0
//!
//! [tools]
//! merger = "/opt/pdftk/bin/pdftk"
//!
//! [run]
//! jobs = 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RmError};

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "rmstamp.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Visual edits applied to annotated pages
    pub style: StyleOptions,
    /// Page geometry overrides
    pub page: PageSettings,
    /// External program names
    pub tools: ToolsConfig,
    /// Execution settings
    pub run: RunSettings,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges the type system cannot express
    pub fn validate(&self) -> Result<()> {
        positive("page.width", self.page.width)?;
        positive("page.height", self.page.height)?;
        positive("style.stroke_width", self.style.stroke_width)?;
        positive("style.highlight_width", Some(self.style.highlight_width))?;
        if let Some(color) = &self.style.color {
            if color.trim().is_empty() {
                return Err(RmError::InvalidOption(
                    "style.color must not be empty".to_string(),
                ));
            }
        }
        if self.run.jobs == 0 {
            return Err(RmError::InvalidOption(
                "run.jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(RmError::InvalidOption(format!(
            "{name} must be a positive number, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// Styling applied to every annotated page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StyleOptions {
    /// Ink color override (hex or named color); `None` keeps the rasterizer's ink
    pub color: Option<String>,
    /// Stroke width override in points; `None` keeps the rasterizer's width
    pub stroke_width: Option<f64>,
    /// Draw a colored bar on the left edge of annotated pages
    pub margin_highlight: bool,
    /// Mute the original page content beneath the strokes
    pub paling: bool,
    /// Fill color of the margin highlight
    pub highlight_color: String,
    /// Width of the margin highlight in points
    pub highlight_width: f64,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            color: None,
            stroke_width: None,
            margin_highlight: false,
            paling: false,
            highlight_color: "#ffd900".to_string(),
            highlight_width: 10.0,
        }
    }
}

/// Page geometry overrides, in points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PageSettings {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// External programs backing the toolchain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Stroke record to SVG converter
    pub rasterizer: String,
    /// PDF metadata reader
    pub metadata: String,
    /// SVG to PDF renderer
    pub renderer: String,
    /// PDF concatenation and stamping tool
    pub merger: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            rasterizer: "rM2svg".to_string(),
            metadata: "pdfinfo".to_string(),
            renderer: "rsvg-convert".to_string(),
            merger: "pdftk".to_string(),
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    /// Number of pages composited concurrently
    pub jobs: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}
