//! `cotune-client`: a headless Cotune player for hosting or listening
//! along from a terminal.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// Quiet by default so notices stay readable; `RUST_LOG` turns logs on.
const DEFAULT_FILTER: &str = "warn";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = commands::Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
