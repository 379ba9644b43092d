//! rulegate - automatic index advice for a multi-tenant rule engine
//!
//! Reads the aggregations that fraud and AML rules run over tenant tables,
//! proposes the smallest set of composite indexes that serves them, and
//! drives the asynchronous creation of those indexes.
//!
//! - `ast`: rule AST boundary
//! - `advisor`: pure, synchronous advice pipeline
//! - `lifecycle`: authorization, job submission and build verification
//! - `observability`: structured logs and counters
//! - `cli`: command-line entry points

pub mod advisor;
pub mod ast;
pub mod cli;
pub mod lifecycle;
pub mod observability;
