//! Lumy - message routing middleware between workflow UIs and processing backends
//!
//! Main entry point for the Lumy CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lumy_config::{LoadedConfig, LoggingConfig};

mod commands;

use commands::{check, start, workflows};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Lumy - message routing middleware between workflow UIs and processing backends
#[derive(Parser)]
#[command(name = "lumy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long, global = true, env = "LUMY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the middleware server
    Start(start::StartArgs),

    /// List workflows in the catalog
    Workflows(workflows::WorkflowsArgs),

    /// Validate a workflow file and show its I/O bindings
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match cli.config {
        Some(ref path) => LoadedConfig::from_file(path)?,
        None => lumy_config::load_config(None)?,
    };

    // Only the server writes a log file; one-shot commands log to the console.
    let file_logging = matches!(cli.command, Commands::Start(_));
    let _guard = init_tracing(cli.verbose, file_logging, &loaded.config.logging());

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        config: loaded.config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Workflows(args) => workflows::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
    }
}

/// Console (human-readable) plus an optional daily-rolling JSON file.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(
    verbose: bool,
    file_logging: bool,
    logging: &LoggingConfig,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "lumy=debug,lumy_server=debug,lumy_pipeline=debug,lumy_config=debug,info"
    } else {
        "lumy=info,lumy_server=info,lumy_pipeline=info,warn"
    };
    // stderr keeps `--json` output on stdout parseable.
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(filter));

    if !(file_logging && logging.file) {
        tracing_subscriber::registry().with(console).init();
        return None;
    }

    let log_dir = logging.dir.clone().unwrap_or_else(lumy_config::log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "lumy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "lumy=trace,lumy_server=trace,lumy_pipeline=trace,lumy_config=trace,info",
                )),
        )
        .init();
    Some(guard)
}
