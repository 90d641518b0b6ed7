//! rmstamp CLI - Command-line interface library
//!
//! Turns a tablet bundle into an annotated PDF using the external
//! toolchain (`rM2svg`, `pdfinfo`, `rsvg-convert`, `pdftk`).
//!
//! # Library Usage
//!
//! ```ignore
//! use rmstamp_cli::{convert_command, load_config, Cli};
//!
//! let config = load_config(&cli)?;
//! let report = convert_command(&input, &output, config, toolchain, interrupted)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Writes notes.pdf in the working directory
//! rmstamp notes.zip
//!
//! # Red ink, thicker strokes, highlighted margins
//! rmstamp -c red -s 2 -r -o annotated.pdf notes.zip
//!
//! # Is everything installed?
//! rmstamp --check-tools
//! ```

pub mod app;

pub use app::{
    check_tools_command, convert_command, execute, exit_code, load_config, run_cli,
    signal_exit_code, Cli,
    EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_NOT_FOUND, EXIT_USAGE,
};
