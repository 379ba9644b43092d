//! CLI argument definitions using clap
//!
//! Commands:
//! - rulegate advise --scenario <path> [--existing <path>]
//! - rulegate families --scenario <path>
//! - rulegate simulate --scenario <path> [--existing <path>] [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rulegate - index advisor for rule engine aggregations
#[derive(Parser, Debug)]
#[command(name = "rulegate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Also log TRACE events (status polling)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the indexes a scenario iteration needs
    Advise {
        /// Scenario iteration JSON (trigger condition and rules)
        #[arg(long)]
        scenario: PathBuf,

        /// JSON list of indexes already on the schema
        #[arg(long)]
        existing: Option<PathBuf>,
    },

    /// Print the aggregation shapes of a scenario and their candidates
    Families {
        /// Scenario iteration JSON (trigger condition and rules)
        #[arg(long)]
        scenario: PathBuf,
    },

    /// Run advice, submission and verification against an in-memory catalog
    Simulate {
        /// Scenario iteration JSON (trigger condition and rules)
        #[arg(long)]
        scenario: PathBuf,

        /// JSON list of indexes already on the schema
        #[arg(long)]
        existing: Option<PathBuf>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
