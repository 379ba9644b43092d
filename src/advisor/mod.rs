//! Index advisor subsystem for rulegate
//!
//! Computes the composite indexes a tenant's schema needs so that the
//! historical aggregations in its rules run as index seeks.
//!
//! # Design Principles
//!
//! - Pure: no I/O, no caches, no global state
//! - Deterministic: same ASTs and existing indexes → same output, same order
//! - Sound: every produced index serves every query shape it was derived from
//! - Total: only unreadable ASTs fail; an unmergeable pair is a normal result
//!
//! # Pipeline
//!
//! 1. [`extract_query_families`]: one shape per distinct aggregation
//! 2. [`candidate_families`]: one family per usable range column
//! 3. [`retain_uncovered`]: drop what existing indexes already serve
//! 4. [`minimize`]: merge families one column ordering can satisfy
//! 5. [`project`]: literal index definitions
//!
//! Identifiers are case-insensitive and normalized to lowercase on entry.

mod concrete;
mod coverage;
mod errors;
mod extract;
mod index_family;
mod minimizer;
mod pipeline;
mod query_family;

pub use concrete::{project, ConcreteIndex};
pub use coverage::{covering_index, retain_uncovered};
pub use errors::{AdvisorError, AdvisorErrorCode, AdvisorResult, Severity};
pub use extract::{extract_query_families, family_from_aggregator, FilterClass};
pub use index_family::{candidate_families, IndexFamily};
pub use minimizer::{merge, minimize};
pub use pipeline::{advise, candidates_for, indexes_to_create, tables_of, Advice, AdviceStats};
pub use query_family::AggregateQueryFamily;

/// Normalizes a table or field name for comparison
pub fn normalize_identifier(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
