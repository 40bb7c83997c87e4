//! Daylog CLI
//!
//! Thin wrapper around daylog-core for writing to, inspecting and cleaning
//! a log directory from scripts.
//!
//! ## Usage
//!
//! ```bash
//! # Write a line to the "deploy" logger
//! daylog --root ./logs --tag ops write deploy --level warn "disk almost full"
//!
//! # Delete this application's files older than a week
//! daylog --root ./logs --tag ops clean --days 7
//!
//! # Show today's files and their total size
//! daylog --root ./logs usage
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use daylog_core::{call_site, Level, LogConfig, LogError, Registry, Settings, COMMON};

/// Daylog - day-rotated log files
#[derive(Parser)]
#[command(name = "daylog")]
#[command(version = "0.1.0")]
#[command(about = "Daylog - write, inspect and clean day-rotated log files")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log root directory (overrides the settings file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Application tag used in file names
    #[arg(short, long, global = true)]
    tag: Option<String>,

    /// JSON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one line to a logger
    Write {
        /// Logger name
        logger: String,

        /// Level of the line
        #[arg(short, long, default_value = "info", value_parser = parse_level)]
        level: Level,

        /// Message words, joined with spaces
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Delete old log files
    Clean {
        /// Keep files modified within this many days
        #[arg(short, long)]
        days: i64,

        /// Consider every file under the root, not only this tag's logs
        #[arg(long)]
        all: bool,
    },

    /// Show the log files of a day and their total size
    Usage {
        /// Day to inspect (default: today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

fn parse_level(s: &str) -> Result<Level, LogError> {
    s.parse()
}

fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

/// Set up logging based on verbosity level
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

fn build_registry(cli: &Cli) -> Result<Registry> {
    let mut builder = LogConfig::builder();

    if let Some(path) = &cli.config {
        let settings = Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        builder = builder.settings(settings);
    }
    if let Some(root) = &cli.root {
        builder = builder.root(root);
    }
    if let Some(tag) = &cli.tag {
        builder = builder.app_tag(tag.clone());
    }

    let config = builder.build();
    if config.root().is_none() {
        bail!("No log root configured; pass --root or a settings file with \"root\"");
    }
    Ok(Registry::new(config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let registry = build_registry(&cli)?;

    match cli.command {
        Commands::Write {
            logger,
            level,
            message,
        } => {
            let log = registry.get(&logger);
            log.event(level, call_site!()).log(&message.join(" "));

            if log.failure_count() > 0 {
                bail!("Failed to write to logger '{}'", log.name());
            }
            if let Some(path) = log.current_path() {
                println!("{}", path.display());
            }
        }

        Commands::Clean { days, all } => {
            let reporter = registry.get(COMMON);
            let retention = Duration::try_days(days)
                .with_context(|| format!("Retention of {} days is out of range", days))?;
            let report = registry.clean(retention, Some(&reporter), all);

            if report.skipped {
                println!("Cleaning skipped: retention under one day");
            } else {
                println!("Deleted {} file(s)", report.deleted);
                if report.failed > 0 {
                    println!("Failed to delete {} file(s)", report.failed);
                }
            }
        }

        Commands::Usage { date } => {
            let date = date.unwrap_or_else(|| registry.now().date_naive());
            let files = registry.log_files_for(date);

            if files.is_empty() {
                println!("No log files for {}", date);
            }
            for path in &files {
                let size = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
                println!("{:>10}  {}", size, path.display());
            }
            println!("Total: {} bytes", registry.day_usage(date));
        }
    }

    Ok(())
}
