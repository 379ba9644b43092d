//! rulegate CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`, which prints the
//! JSON response (or error response) on stdout. Exits non-zero on failure.

use rulegate::cli;

fn main() {
    if cli::run().is_err() {
        std::process::exit(1);
    }
}
