//! Argument definitions. Command bodies live in `commands`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - bank reconciliation and duplicate screening
#[derive(Parser)]
#[command(name = "tally")]
#[command(
    about = "Match bank activity against the books and screen imports for duplicates",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Matching configuration (TOML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile bank transactions against book records
    Reconcile {
        /// JSON reconciliation request
        #[arg(short, long)]
        input: PathBuf,

        /// Print the plain-text report instead of JSON
        #[arg(long)]
        report: bool,
    },

    /// Screen new transactions for duplicates
    Dedup {
        /// JSON array of incoming transactions
        #[arg(short, long)]
        new: PathBuf,

        /// JSON array of previously imported transactions
        #[arg(short, long)]
        existing: Option<PathBuf>,
    },
}
