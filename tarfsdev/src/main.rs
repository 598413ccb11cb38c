mod application;
mod presentation;

use clap::Parser;
use presentation::cli::Cli;
use tarfs_core::error::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    application::run(Cli::parse())
}
