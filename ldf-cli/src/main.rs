//! LDF Editor CLI Application
//!
//! Host-facing process for the ldf-editor library. One invocation handles
//! one request:
//! - reads a JSON request from the first argument (or stdin)
//! - dispatches `parse` / `save` to the editor
//! - prints exactly one JSON response line on stdout
//!
//! Logs go to stderr so stdout stays machine-readable.

use anyhow::{Context, Result};
use clap::Parser;
use ldf_editor::{Dispatcher, Editor, Response};
use log::LevelFilter;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;

/// LDF Editor - Edit LIN Description Files through JSON requests
#[derive(Parser, Debug)]
#[command(name = "ldf-cli")]
#[command(about = "Parse and edit LIN Description Files (LDF)", long_about = None)]
#[command(version)]
struct Args {
    /// JSON request, e.g. '{"command": "parse", "args": {"path": "body.ldf"}}'.
    /// Read from stdin when omitted or "-"
    #[arg(value_name = "REQUEST")]
    request: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let response = match run(&args) {
        Ok(response) => response,
        Err(e) => {
            log::error!("{:#}", e);
            Response::error(format!("{:#}", e))
        }
    };

    println!("{}", response.to_json_line());
    ExitCode::from(response.exit_code())
}

/// Load configuration, set up logging and handle the request
fn run(args: &Args) -> Result<Response> {
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };

    let configured = config.logging.level_filter()?;
    init_logging(args.verbose, args.quiet, configured);

    log::info!("LDF Editor CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using editor library v{}", ldf_editor::VERSION);
    log::debug!("Editor configuration: {:?}", config.editor);

    let input = read_request(args.request.as_deref())?;
    let dispatcher = Dispatcher::new(Editor::with_config(config.editor));
    Ok(dispatcher.handle_json(&input))
}

/// Take the request from the argument, falling back to stdin
fn read_request(arg: Option<&str>) -> Result<String> {
    match arg {
        Some(request) if request != "-" => Ok(request.to_string()),
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read request from stdin")?;
            Ok(input)
        }
    }
}

/// Initialize logging based on verbosity level
///
/// `-q` wins over everything; `-v` flags override the configured level.
fn init_logging(verbose: u8, quiet: bool, configured: Option<LevelFilter>) {
    use env_logger::{Builder, Target};
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => configured.unwrap_or(LevelFilter::Warn),
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    // try_init: a logger may already be installed when run from tests
    let _ = Builder::new()
        .target(Target::Stderr)
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
