//! CLI application that watches a directory for receipt images and appends
//! the parsed receipts to a CSV ledger.

mod scan;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use receipt_core::ScannerConfig;

/// Japanese receipt scanner - OCR receipts dropped into a folder and keep a CSV ledger
#[derive(Parser)]
#[command(name = "receipt-scanner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch for receipt images
    watch_dir: PathBuf,

    /// CSV ledger to append parsed receipts to
    output_csv: PathBuf,

    /// Also watch subdirectories
    #[arg(long)]
    recursive: bool,

    /// Polling interval in seconds when native file events are unavailable [default: 1.0]
    #[arg(long, value_name = "SECS", value_parser = parse_interval)]
    poll_interval: Option<f64>,

    /// Parse receipts and log the results without writing the ledger
    #[arg(long)]
    dry_run: bool,

    /// Process images already in the directory before watching
    #[arg(long)]
    process_existing: bool,

    /// Log level
    #[arg(long, value_enum, ignore_case = true, default_value = "info")]
    log_level: LogLevel,

    /// OCR language hint passed to Tesseract [default: jpn]
    #[arg(long)]
    lang: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    Critical,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error | LogLevel::Critical => Level::ERROR,
        }
    }
}

fn parse_interval(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err("interval must be a positive number of seconds".to_string())
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("receipt-scanner").join("config.json"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ScannerConfig> {
    if let Some(path) = path {
        return ScannerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            debug!("Using config file {}", path.display());
            ScannerConfig::from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        _ => Ok(ScannerConfig::default()),
    }
}

/// Build the effective configuration: file values overridden by flags.
fn build_config(cli: &Cli) -> anyhow::Result<ScannerConfig> {
    let mut config = load_config(cli.config.as_deref())?;

    config.watch_dir = cli.watch_dir.clone();
    config.output_csv = cli.output_csv.clone();
    config.recursive |= cli.recursive;
    config.dry_run |= cli.dry_run;
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }
    if let Some(lang) = &cli.lang {
        config.ocr.language = lang.clone();
    }

    config
        .resolve_paths()
        .context("Failed to resolve watch directory and ledger paths")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = build_config(&cli)?;
    scan::run(config, cli.process_existing).await
}
