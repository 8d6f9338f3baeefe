//! CLI for Strata
//!
//! Runs the profile engine over JSON-encoded profiles:
//! - merge: combine profiles into one canonical profile
//! - normalize: deduplicate and garbage-collect a single profile
//! - repair: fix producer defects in a single profile

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata - profile merge and normalization engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print engine metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge profiles into one
    Merge(commands::merge::MergeArgs),

    /// Normalize a single profile
    Normalize(commands::normalize::NormalizeArgs),

    /// Repair producer defects in a single profile
    Repair(commands::repair::RepairArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;
    let result = match cli.command {
        Commands::Merge(args) => commands::merge::run(args, &config),
        Commands::Normalize(args) => commands::normalize::run(args),
        Commands::Repair(args) => commands::repair::run(args, &config),
    };
    if let Err(e) = &result {
        output::error(&format!("{:#}", e));
    }
    if cli.metrics {
        eprintln!("{}", strata_aggregator::metrics::encode_metrics()?);
    }
    result
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
