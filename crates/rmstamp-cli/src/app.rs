//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use rmstamp_core::{
    default_output_path, missing_programs, Config, Pipeline, RmError, RunReport, ToolsConfig,
    Toolchain, CONFIG_FILE_NAME,
};

/// Exit status for an input bundle that does not exist
pub const EXIT_NOT_FOUND: u8 = 1;
/// Exit status for invalid arguments or option values
pub const EXIT_USAGE: u8 = 2;
/// Exit status for any other failure
pub const EXIT_FAILURE: u8 = 3;
/// Exit status after an interrupt (128 + SIGINT)
pub const EXIT_INTERRUPTED: u8 = 130;

/// Signals that stop the run at its next checkpoint
#[cfg(unix)]
const STOP_SIGNALS: &[i32] = &[
    signal_hook::consts::SIGINT,
    signal_hook::consts::SIGTERM,
    signal_hook::consts::SIGHUP,
    signal_hook::consts::SIGQUIT,
];
#[cfg(not(unix))]
const STOP_SIGNALS: &[i32] = &[signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM];

#[derive(Parser, Debug)]
#[command(name = "rmstamp")]
#[command(author, version, about = "Stamp tablet annotations onto their original PDF", long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Input bundle (zip archive with the original PDF and stroke records)
    #[arg(required_unless_present = "check_tools")]
    pub input: Option<PathBuf>,

    /// Ink color for all strokes (hex or named color)
    #[arg(short = 'c', long, value_name = "COLOR")]
    pub color: Option<String>,

    /// Page width in points
    #[arg(short = 'w', long, value_name = "POINTS", value_parser = positive_number)]
    pub width: Option<f64>,

    /// Page height in points
    #[arg(short = 'h', long, value_name = "POINTS", value_parser = positive_number)]
    pub height: Option<f64>,

    /// Stroke width for all strokes
    #[arg(short = 's', long, value_name = "WIDTH", value_parser = positive_number)]
    pub stroke_width: Option<f64>,

    /// Highlight the left margin of annotated pages
    #[arg(short = 'r', long)]
    pub highlight: bool,

    /// Pale the original content beneath the strokes
    #[arg(short = 'p', long)]
    pub pale: bool,

    /// Output PDF (defaults to the bundle name with a .pdf extension)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of pages converted in parallel
    #[arg(short = 'j', long, value_name = "N", value_parser = worker_count)]
    pub jobs: Option<usize>,

    /// Configuration file (defaults to ./rmstamp.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Report which external programs are missing and exit
    #[arg(long)]
    pub check_tools: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(color) = &self.color {
            config.style.color = Some(color.clone());
        }
        if let Some(width) = self.stroke_width {
            config.style.stroke_width = Some(width);
        }
        if self.highlight {
            config.style.margin_highlight = true;
        }
        if self.pale {
            config.style.paling = true;
        }
        if self.width.is_some() {
            config.page.width = self.width;
        }
        if self.height.is_some() {
            config.page.height = self.height;
        }
        if let Some(jobs) = self.jobs {
            config.run.jobs = jobs;
        }
    }

    /// Where the result goes
    pub fn output_path(&self, input: &Path) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(input))
    }
}

fn positive_number(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("`{s}` must be greater than zero"))
    }
}

fn worker_count(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("`{s}` is not a positive whole number")),
    }
}

/// Run the CLI with the process arguments
pub fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let interrupted = Arc::new(AtomicBool::new(false));
    let received = Arc::new(AtomicUsize::new(0));
    if let Err(e) = install_signal_handlers(&interrupted, &received) {
        log::warn!("Could not install signal handlers: {e}");
    }

    match execute(&cli, Arc::clone(&interrupted)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match received.load(Ordering::SeqCst) {
                0 => ExitCode::from(exit_code(&err)),
                signal => ExitCode::from(signal_exit_code(signal)),
            }
        }
    }
}

/// Route stop signals into `interrupted`, remembering which one arrived
///
/// The default disposition is replaced, so the process keeps running until
/// the pipeline reaches a checkpoint and drops its workspace.
fn install_signal_handlers(
    interrupted: &Arc<AtomicBool>,
    received: &Arc<AtomicUsize>,
) -> std::io::Result<()> {
    for &signal in STOP_SIGNALS {
        signal_hook::flag::register(signal, Arc::clone(interrupted))?;
        signal_hook::flag::register_usize(signal, Arc::clone(received), signal as usize)?;
    }
    Ok(())
}

/// Exit status for a run stopped by `signal` (128 + signal number)
pub fn signal_exit_code(signal: usize) -> u8 {
    u8::try_from(128 + signal).unwrap_or(u8::MAX)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

/// Exit status for a failed run
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RmError>() {
        Some(RmError::NotFound(_)) => EXIT_NOT_FOUND,
        Some(RmError::InvalidOption(_)) => EXIT_USAGE,
        Some(RmError::Interrupted) => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

/// Execute a parsed command line against the system toolchain
pub fn execute(cli: &Cli, interrupted: Arc<AtomicBool>) -> Result<()> {
    let config = load_config(cli)?;

    if cli.check_tools {
        return check_tools_command(&config.tools);
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("No input bundle given");
    };
    let output = cli.output_path(input);
    let toolchain = Toolchain::system(&config.tools);

    let report = convert_command(input, &output, config, toolchain, interrupted)?;
    println!(
        "Wrote {} ({} pages, {} annotated)",
        report.output.display(),
        report.page_count,
        report.annotated_pages.len()
    );
    Ok(())
}

/// Build the run configuration: flags over config file over defaults
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            local.is_file().then_some(local)
        }
    };

    let mut config = match path {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            Config::load(&path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// Convert one bundle with the given toolchain
pub fn convert_command(
    input: &Path,
    output: &Path,
    config: Config,
    toolchain: Toolchain,
    interrupted: Arc<AtomicBool>,
) -> Result<RunReport> {
    log::debug!("Toolchain: {}", toolchain.names().join(", "));
    let pipeline = Pipeline::new(config, toolchain)?.with_cancellation(interrupted);
    let report = pipeline
        .run(input, output)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    Ok(report)
}

/// Report missing external programs; fails when any is missing
pub fn check_tools_command(tools: &ToolsConfig) -> Result<()> {
    let missing = missing_programs(tools);
    for program in [
        &tools.rasterizer,
        &tools.metadata,
        &tools.renderer,
        &tools.merger,
    ] {
        let status = if missing.contains(program) {
            "missing"
        } else {
            "ok"
        };
        println!("{program:<16} {status}");
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing external programs: {}", missing.join(", "));
    }
    Ok(())
}
