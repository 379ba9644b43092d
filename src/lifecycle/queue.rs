//! # In-Memory Job Queue
//!
//! A single-process stand-in for the durable job substrate. Jobs are held
//! in a vector and run by [`MemoryJobQueue::run_due`] against a caller
//! supplied clock, so tests and the CLI simulation can step time forward
//! without sleeping.
//!
//! Failure policy: a worker error is logged and the job is retried with a
//! linear backoff of `attempt` seconds, up to [`MAX_ATTEMPTS`] attempts.
//! Snoozes are not failures and never count as attempts.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event};

use super::errors::{LifecycleError, LifecycleResult};
use super::jobs::{to_chrono, JobQueue, JobRequest, QueuedJob, WorkOutcome, Worker};

/// Attempts before a failing job is discarded
pub const MAX_ATTEMPTS: u32 = 3;

/// Outcome counts of one `run_due` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs that finished
    pub done: usize,
    /// Jobs rescheduled by their worker
    pub snoozed: usize,
    /// Jobs that returned an error and were rescheduled
    pub retried: usize,
    /// Jobs discarded after their last attempt
    pub discarded: usize,
}

impl RunReport {
    /// Number of jobs run
    pub fn ran(&self) -> usize {
        self.done + self.snoozed + self.retried + self.discarded
    }
}

/// In-memory job queue
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<QueuedJob>>,
    discarded: Mutex<Vec<QueuedJob>>,
}

impl MemoryJobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_jobs(&self) -> LifecycleResult<MutexGuard<'_, Vec<QueuedJob>>> {
        self.jobs
            .lock()
            .map_err(|_| LifecycleError::Queue("Lock poisoned".into()))
    }

    /// Jobs still queued, in enqueue order
    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().map(|j| j.clone()).unwrap_or_default()
    }

    /// Jobs still queued on one queue
    pub fn jobs_on(&self, queue: &str) -> Vec<QueuedJob> {
        self.jobs()
            .into_iter()
            .filter(|j| j.options.queue == queue)
            .collect()
    }

    /// Jobs dropped after exhausting their attempts
    pub fn discarded(&self) -> Vec<QueuedJob> {
        self.discarded.lock().map(|j| j.clone()).unwrap_or_default()
    }

    /// Whether no job is queued
    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Earliest scheduled time among queued jobs
    pub fn next_scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.jobs().iter().map(|j| j.options.scheduled_at).min()
    }

    /// Runs every job due at `now` once.
    ///
    /// Due jobs are ordered by priority, then scheduled time, then queue.
    /// Jobs enqueued while the pass runs wait for the next pass. A job
    /// with no matching worker stays queued.
    pub async fn run_due(
        &self,
        workers: &[&dyn Worker],
        now: DateTime<Utc>,
    ) -> LifecycleResult<RunReport> {
        let mut due: Vec<QueuedJob> = {
            let jobs = self.lock_jobs()?;
            jobs.iter()
                .filter(|j| j.options.scheduled_at <= now)
                .cloned()
                .collect()
        };
        due.sort_by(|a, b| {
            (a.options.priority, a.options.scheduled_at, &a.options.queue).cmp(&(
                b.options.priority,
                b.options.scheduled_at,
                &b.options.queue,
            ))
        });

        let mut report = RunReport::default();
        for job in due {
            let Some(worker) = workers.iter().find(|w| w.kind() == job.kind) else {
                continue;
            };

            match worker.work(&job).await {
                Ok(WorkOutcome::Done) => {
                    self.remove(job.id)?;
                    report.done += 1;
                }
                Ok(WorkOutcome::Snooze(delay)) => {
                    self.update(job.id, |j| j.options.scheduled_at = now + to_chrono(delay))?;
                    report.snoozed += 1;
                }
                Err(e) => {
                    let attempt = job.attempt + 1;
                    log_event_with_fields(
                        Event::JobFailed,
                        &[
                            ("job_id", &job.id.to_string()),
                            ("kind", job.kind.as_str()),
                            ("attempt", &attempt.to_string()),
                            ("error", &e.to_string()),
                        ],
                    );

                    if e.is_retryable() && attempt < MAX_ATTEMPTS {
                        let backoff = chrono::Duration::seconds(i64::from(attempt));
                        self.update(job.id, |j| {
                            j.attempt = attempt;
                            j.options.scheduled_at = now + backoff;
                        })?;
                        report.retried += 1;
                    } else if let Some(mut dropped) = self.remove(job.id)? {
                        dropped.attempt = attempt;
                        if let Ok(mut discarded) = self.discarded.lock() {
                            discarded.push(dropped);
                        }
                        report.discarded += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    fn remove(&self, id: Uuid) -> LifecycleResult<Option<QueuedJob>> {
        let mut jobs = self.lock_jobs()?;
        Ok(jobs
            .iter()
            .position(|j| j.id == id)
            .map(|pos| jobs.remove(pos)))
    }

    fn update<F: FnOnce(&mut QueuedJob)>(&self, id: Uuid, f: F) -> LifecycleResult<()> {
        let mut jobs = self.lock_jobs()?;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            f(job);
        }
        Ok(())
    }
}

impl JobQueue for MemoryJobQueue {
    fn enqueue(&self, request: JobRequest) -> BoxFuture<'_, LifecycleResult<Uuid>> {
        Box::pin(async move {
            let id = Uuid::new_v4();
            let mut jobs = self.lock_jobs()?;
            jobs.push(QueuedJob {
                id,
                org_id: request.org_id,
                kind: request.kind,
                payload: request.payload,
                options: request.options,
                attempt: 0,
            });
            Ok(id)
        })
    }
}
