//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting
//! - The HTTP API over saved weather records

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod output;
mod state;

const DEFAULT_LOG_FILTER: &str = "weather_app=info,weather_core=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();

    // Logs go to stderr so `lookup` output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    cmd.run().await
}
