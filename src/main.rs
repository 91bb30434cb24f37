//! Chart Minder - chord chart canonicalization, transposition and matching.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use chart_minder::cli;

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so rendered charts and JSON stay clean on stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chart_minder=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
