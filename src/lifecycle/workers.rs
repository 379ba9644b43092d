//! # Index Lifecycle Workers
//!
//! Two workers run on each organization's queue:
//!
//! - [`IndexCreationWorker`] hands a batch to the catalog and schedules a
//!   status check.
//! - [`IndexStatusWorker`] snoozes while any requested build is pending,
//!   then resubmits what went missing, at most `max_resubmissions` times.
//!
//! Neither worker waits on a build.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::advisor::ConcreteIndex;
use crate::observability::{log_event_with_fields, AdvisorMetrics, Event};

use super::catalog::IndexCatalog;
use super::config::LifecycleConfig;
use super::errors::LifecycleResult;
use super::jobs::{
    EnqueueOptions, IndexCreationJob, IndexStatusJob, JobKind, JobQueue, JobRequest, QueuedJob,
    WorkOutcome, Worker,
};

/// Renders a batch for log lines
fn describe(indexes: &[ConcreteIndex]) -> String {
    indexes
        .iter()
        .map(ConcreteIndex::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn contains(haystack: &[ConcreteIndex], index: &ConcreteIndex) -> bool {
    haystack.iter().any(|i| i.same_definition(index))
}

/// Catalogs may report identifiers in their own case
fn normalize_all(indexes: Vec<ConcreteIndex>) -> Vec<ConcreteIndex> {
    indexes.iter().map(ConcreteIndex::normalized).collect()
}

/// Submits index builds and schedules their verification
pub struct IndexCreationWorker {
    catalog: Arc<dyn IndexCatalog>,
    queue: Arc<dyn JobQueue>,
    config: LifecycleConfig,
}

impl IndexCreationWorker {
    pub fn new(
        catalog: Arc<dyn IndexCatalog>,
        queue: Arc<dyn JobQueue>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            catalog,
            queue,
            config,
        }
    }

    async fn run(&self, job: &QueuedJob) -> LifecycleResult<WorkOutcome> {
        let payload: IndexCreationJob = job.decode()?;
        let org = payload.org_id.to_string();

        self.catalog
            .create_indexes_async(payload.org_id, &payload.indexes)
            .await?;
        log_event_with_fields(
            Event::CreationSubmitted,
            &[
                ("org_id", &org),
                ("count", &payload.indexes.len().to_string()),
                ("resubmissions", &payload.resubmissions.to_string()),
                ("indexes", &describe(&payload.indexes)),
            ],
        );

        let status = IndexStatusJob {
            org_id: payload.org_id,
            indexes: payload.indexes,
            resubmissions: payload.resubmissions,
        };
        let options = EnqueueOptions::for_org(payload.org_id, self.config.job_priority)
            .scheduled_in(self.config.status_check_delay());
        self.queue
            .enqueue(JobRequest::new(
                payload.org_id,
                JobKind::IndexCreationStatus,
                &status,
                options,
            )?)
            .await?;

        Ok(WorkOutcome::Done)
    }
}

impl Worker for IndexCreationWorker {
    fn kind(&self) -> JobKind {
        JobKind::IndexCreation
    }

    fn work<'a>(&'a self, job: &'a QueuedJob) -> BoxFuture<'a, LifecycleResult<WorkOutcome>> {
        Box::pin(self.run(job))
    }
}

/// Verifies submitted builds
pub struct IndexStatusWorker {
    catalog: Arc<dyn IndexCatalog>,
    queue: Arc<dyn JobQueue>,
    config: LifecycleConfig,
    metrics: Arc<AdvisorMetrics>,
}

impl IndexStatusWorker {
    pub fn new(
        catalog: Arc<dyn IndexCatalog>,
        queue: Arc<dyn JobQueue>,
        config: LifecycleConfig,
        metrics: Arc<AdvisorMetrics>,
    ) -> Self {
        Self {
            catalog,
            queue,
            config,
            metrics,
        }
    }

    async fn run(&self, job: &QueuedJob) -> LifecycleResult<WorkOutcome> {
        let mut payload: IndexStatusJob = job.decode()?;
        payload.indexes = normalize_all(payload.indexes);
        let org = payload.org_id.to_string();

        let pending = normalize_all(
            self.catalog
                .list_indices_pending_creation(payload.org_id)
                .await?,
        );
        let building = payload
            .indexes
            .iter()
            .filter(|i| contains(&pending, i))
            .count();
        if building > 0 {
            log_event_with_fields(
                Event::StatusPending,
                &[("org_id", &org), ("pending", &building.to_string())],
            );
            self.metrics.increment_status_snoozes();
            return Ok(WorkOutcome::Snooze(self.config.status_check_delay()));
        }

        let valid = self.valid_indexes(payload.org_id, &payload.indexes).await?;
        let (built, missing): (Vec<ConcreteIndex>, Vec<ConcreteIndex>) = payload
            .indexes
            .into_iter()
            .partition(|i| contains(&valid, i));
        self.metrics.add_indexes_created(built.len());

        if missing.is_empty() {
            log_event_with_fields(
                Event::CreationComplete,
                &[("org_id", &org), ("count", &built.len().to_string())],
            );
            return Ok(WorkOutcome::Done);
        }

        if payload.resubmissions < self.config.max_resubmissions {
            self.resubmit(payload.org_id, missing, payload.resubmissions + 1)
                .await?;
        } else {
            log_event_with_fields(
                Event::CreationFailed,
                &[
                    ("org_id", &org),
                    ("count", &missing.len().to_string()),
                    ("indexes", &describe(&missing)),
                ],
            );
            self.metrics.add_indexes_failed(missing.len());
        }

        Ok(WorkOutcome::Done)
    }

    /// Valid indexes of every table the batch touches
    async fn valid_indexes(
        &self,
        org_id: Uuid,
        requested: &[ConcreteIndex],
    ) -> LifecycleResult<Vec<ConcreteIndex>> {
        let tables: BTreeSet<&str> = requested.iter().map(|i| i.table.as_str()).collect();
        let mut valid = Vec::new();
        for table in tables {
            valid.extend(self.catalog.list_all_valid_indexes(org_id, table).await?);
        }
        Ok(normalize_all(valid))
    }

    async fn resubmit(
        &self,
        org_id: Uuid,
        missing: Vec<ConcreteIndex>,
        resubmissions: u32,
    ) -> LifecycleResult<()> {
        let count = missing.len();
        let description = describe(&missing);
        let job = IndexCreationJob {
            org_id,
            indexes: missing,
            resubmissions,
        };
        let options = EnqueueOptions::for_org(org_id, self.config.job_priority)
            .scheduled_in(self.config.retry_delay());
        self.queue
            .enqueue(JobRequest::new(org_id, JobKind::IndexCreation, &job, options)?)
            .await?;

        log_event_with_fields(
            Event::CreationResubmitted,
            &[
                ("org_id", &org_id.to_string()),
                ("count", &count.to_string()),
                ("resubmissions", &resubmissions.to_string()),
                ("indexes", &description),
            ],
        );
        self.metrics.add_indexes_resubmitted(count);
        Ok(())
    }
}

impl Worker for IndexStatusWorker {
    fn kind(&self) -> JobKind {
        JobKind::IndexCreationStatus
    }

    fn work<'a>(&'a self, job: &'a QueuedJob) -> BoxFuture<'a, LifecycleResult<WorkOutcome>> {
        Box::pin(self.run(job))
    }
}
