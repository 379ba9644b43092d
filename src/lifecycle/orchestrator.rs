//! # Index Orchestrator
//!
//! Entry point of the index lifecycle. Computing advice reads the
//! iteration and the catalog; creating indexes only enqueues a job and
//! returns, the builds themselves run in [`super::workers`].
//!
//! Authorization is checked before any catalog read or queue write.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::advisor::{advise, extract_query_families, tables_of, ConcreteIndex};
use crate::observability::{
    log_event_with_fields, AdvisorMetrics, Event, ObservationScope, Severity,
};

use super::auth::{Credentials, IndexPermissions};
use super::catalog::IndexCatalog;
use super::config::LifecycleConfig;
use super::errors::{LifecycleError, LifecycleResult};
use super::jobs::{EnqueueOptions, IndexCreationJob, JobKind, JobQueue, JobRequest};
use super::repository::{IterationRepository, ScenarioIteration};
use super::workers::{IndexCreationWorker, IndexStatusWorker};

/// Indexes an iteration still needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexesToCreate {
    /// Indexes to create, in deterministic order
    pub to_create: Vec<ConcreteIndex>,
    /// Builds of the organization still running from an earlier request
    pub num_pending: usize,
}

/// Computes, submits and verifies indexes for scenario iterations
pub struct IndexOrchestrator {
    catalog: Arc<dyn IndexCatalog>,
    queue: Arc<dyn JobQueue>,
    iterations: Arc<dyn IterationRepository>,
    permissions: Arc<dyn IndexPermissions>,
    config: LifecycleConfig,
    metrics: Arc<AdvisorMetrics>,
}

impl IndexOrchestrator {
    /// Create an orchestrator with its own metrics registry
    pub fn new(
        catalog: Arc<dyn IndexCatalog>,
        queue: Arc<dyn JobQueue>,
        iterations: Arc<dyn IterationRepository>,
        permissions: Arc<dyn IndexPermissions>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            catalog,
            queue,
            iterations,
            permissions,
            config,
            metrics: Arc::new(AdvisorMetrics::new()),
        }
    }

    /// Share a metrics registry
    pub fn with_metrics(mut self, metrics: Arc<AdvisorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics registry
    pub fn metrics(&self) -> &Arc<AdvisorMetrics> {
        &self.metrics
    }

    /// Lifecycle configuration
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Worker for `IndexCreation` jobs, wired to the same collaborators
    pub fn creation_worker(&self) -> IndexCreationWorker {
        IndexCreationWorker::new(
            self.catalog.clone(),
            self.queue.clone(),
            self.config.clone(),
        )
    }

    /// Worker for `IndexCreationStatus` jobs, wired to the same collaborators
    pub fn status_worker(&self) -> IndexStatusWorker {
        IndexStatusWorker::new(
            self.catalog.clone(),
            self.queue.clone(),
            self.config.clone(),
            self.metrics.clone(),
        )
    }

    fn authorize(&self, credentials: &Credentials, org_id: Uuid) -> LifecycleResult<()> {
        self.permissions
            .can_manage_indexes(credentials, org_id)
            .inspect_err(|_| {
                log_event_with_fields(
                    Event::AuthorizationDenied,
                    &[
                        ("org_id", &org_id.to_string()),
                        ("caller_org_id", &credentials.org_id.to_string()),
                    ],
                );
            })
    }

    /// Indexes the iteration needs that the organization does not have.
    ///
    /// An invalid AST fails the whole call; no partial advice is returned.
    pub async fn get_indexes_to_create(
        &self,
        credentials: &Credentials,
        iteration_id: Uuid,
    ) -> LifecycleResult<IndexesToCreate> {
        let iteration = self.iterations.get_iteration(iteration_id).await?;
        self.indexes_for(credentials, &iteration).await
    }

    async fn indexes_for(
        &self,
        credentials: &Credentials,
        iteration: &ScenarioIteration,
    ) -> LifecycleResult<IndexesToCreate> {
        let org_id = iteration.org_id;
        self.authorize(credentials, org_id)?;

        let scope = ObservationScope::with_fields(
            "INDEX_ADVICE",
            vec![
                ("org_id", org_id.to_string()),
                ("iteration_id", iteration.id.to_string()),
            ],
        );

        let query_families = match extract_query_families(iteration.asts()) {
            Ok(families) => families,
            Err(e) => {
                self.metrics.increment_advice_rejected();
                log_event_with_fields(
                    Event::AdviceRejected,
                    &[("org_id", &org_id.to_string()), ("error", &e.to_string())],
                );
                scope.fail(Severity::Warn, e.message());
                return Err(LifecycleError::InvalidAst(e));
            }
        };
        log_event_with_fields(
            Event::QueryFamiliesExtracted,
            &[
                ("org_id", &org_id.to_string()),
                ("count", &query_families.len().to_string()),
            ],
        );

        let mut existing = Vec::new();
        for table in tables_of(&query_families) {
            existing.extend(self.catalog.list_all_valid_indexes(org_id, &table).await?);
        }
        let num_pending = self
            .catalog
            .list_indices_pending_creation(org_id)
            .await?
            .len();

        let advice = advise(query_families, &existing);
        let stats = advice.stats;
        self.metrics.record_advice(
            stats.query_families,
            stats.candidates,
            stats.covered,
            stats.proposed,
        );
        log_event_with_fields(
            Event::AdviceComputed,
            &[
                ("org_id", &org_id.to_string()),
                ("candidates", &stats.candidates.to_string()),
                ("covered", &stats.covered.to_string()),
                ("proposed", &stats.proposed.to_string()),
                ("num_pending", &num_pending.to_string()),
            ],
        );
        scope.complete(&[("proposed", &stats.proposed.to_string())]);

        Ok(IndexesToCreate {
            to_create: advice.to_create,
            num_pending,
        })
    }

    /// Enqueues an index creation job on the organization's queue.
    ///
    /// Returns the job ID, or `None` when there is nothing to create.
    pub async fn create_indexes_async(
        &self,
        credentials: &Credentials,
        org_id: Uuid,
        indexes: Vec<ConcreteIndex>,
    ) -> LifecycleResult<Option<Uuid>> {
        self.authorize(credentials, org_id)?;
        if indexes.is_empty() {
            return Ok(None);
        }

        let count = indexes.len();
        let job = IndexCreationJob {
            org_id,
            indexes: indexes.iter().map(ConcreteIndex::normalized).collect(),
            resubmissions: 0,
        };
        let request = JobRequest::new(
            org_id,
            JobKind::IndexCreation,
            &job,
            EnqueueOptions::for_org(org_id, self.config.job_priority),
        )?;
        let job_id = self.queue.enqueue(request).await?;

        self.metrics.increment_jobs_enqueued();
        log_event_with_fields(
            Event::CreationEnqueued,
            &[
                ("org_id", &org_id.to_string()),
                ("job_id", &job_id.to_string()),
                ("count", &count.to_string()),
            ],
        );
        Ok(Some(job_id))
    }

    /// Computes the iteration's missing indexes and submits them if any.
    ///
    /// Used when an iteration is prepared for publication.
    pub async fn ensure_indexes_for_iteration(
        &self,
        credentials: &Credentials,
        iteration_id: Uuid,
    ) -> LifecycleResult<IndexesToCreate> {
        let iteration = self.iterations.get_iteration(iteration_id).await?;
        let indexes = self.indexes_for(credentials, &iteration).await?;
        self.create_indexes_async(credentials, iteration.org_id, indexes.to_create.clone())
            .await?;
        Ok(indexes)
    }
}
