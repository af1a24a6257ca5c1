//! Tally CLI
//!
//! Usage:
//!   tally reconcile --input request.json [--report]
//!   tally dedup --new new.json [--existing history.json]
//!
//! Both commands accept `--config tally.toml` and write JSON to stdout.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Reconcile { input, report } => commands::cmd_reconcile(&config, &input, report),
        Commands::Dedup { new, existing } => {
            commands::cmd_dedup(&config, &new, existing.as_deref())
        }
    }
}
