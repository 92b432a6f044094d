//! Binary crate for the `jacket` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - The interactive outing form
//! - Human-friendly output formatting
//! - Serving the HTTP API

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod ask;
mod cli;
mod output;
mod server;

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    // stderr keeps log lines out of the prompts and rendered results
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cmd = cli::Cli::parse();
    init_tracing(cmd.default_log_filter());
    cmd.run().await
}
