//! # Index Lifecycle
//!
//! Turns advice into physical indexes on a tenant's schema.
//!
//! ```text
//! get_indexes_to_create ──► create_indexes_async ──► IndexCreation job
//!                                                        │
//!                                   catalog.create_indexes_async
//!                                                        │
//!                                            IndexCreationStatus job
//!                                          pending? ──► snooze
//!                                          missing? ──► resubmit (bounded)
//!                                          all valid ──► done
//! ```
//!
//! The catalog, the job queue, the iteration store and the permission
//! check are traits; in-memory implementations back tests and the CLI.

mod auth;
mod catalog;
mod config;
mod errors;
mod jobs;
mod orchestrator;
mod queue;
mod repository;
mod workers;

pub use auth::{Credentials, IndexPermissions, Role, RolePermissions};
pub use catalog::{IndexCatalog, MemoryCatalog};
pub use config::LifecycleConfig;
pub use errors::{LifecycleError, LifecycleResult};
pub use jobs::{
    EnqueueOptions, IndexCreationJob, IndexStatusJob, JobKind, JobQueue, JobRequest, QueuedJob,
    WorkOutcome, Worker,
};
pub use orchestrator::{IndexOrchestrator, IndexesToCreate};
pub use queue::{MemoryJobQueue, RunReport, MAX_ATTEMPTS};
pub use repository::{IterationRepository, MemoryIterationRepository, Rule, ScenarioIteration};
pub use workers::{IndexCreationWorker, IndexStatusWorker};
