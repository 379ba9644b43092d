//! CLI module for rulegate
//!
//! Provides command-line interface for:
//! - advise: Indexes a scenario iteration needs
//! - families: Aggregation shapes and candidate indexes of a scenario
//! - simulate: Full index lifecycle on in-memory collaborators

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{advise, families, run, run_command, simulate, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json_file, write_error, write_response};
