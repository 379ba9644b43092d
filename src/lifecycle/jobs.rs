//! # Job Queue Boundary
//!
//! The async job substrate is external: it persists jobs, runs them on
//! per-organization queues and retries failures. This module defines the
//! payloads the lifecycle puts on it and the worker contract it expects.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::advisor::ConcreteIndex;

use super::errors::LifecycleResult;

/// Kind of a queued job, selects the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Submit index builds to the catalog
    IndexCreation,
    /// Verify submitted builds
    IndexCreationStatus,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::IndexCreation => "index_creation",
            JobKind::IndexCreationStatus => "index_creation_status",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of an `IndexCreation` job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCreationJob {
    /// Tenant organization
    pub org_id: Uuid,
    /// Indexes to build
    pub indexes: Vec<ConcreteIndex>,
    /// How many times these indexes were already submitted and lost
    #[serde(default)]
    pub resubmissions: u32,
}

/// Payload of an `IndexCreationStatus` job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatusJob {
    /// Tenant organization
    pub org_id: Uuid,
    /// Indexes whose builds were submitted
    pub indexes: Vec<ConcreteIndex>,
    /// Carried over from the creation job
    #[serde(default)]
    pub resubmissions: u32,
}

/// Queue placement of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Queue name; one queue per organization
    pub queue: String,
    /// Earliest time the job may run
    pub scheduled_at: DateTime<Utc>,
    /// Lower runs first
    pub priority: i16,
}

impl EnqueueOptions {
    /// Run as soon as possible on the organization's queue
    pub fn for_org(org_id: Uuid, priority: i16) -> Self {
        Self {
            queue: org_id.to_string(),
            scheduled_at: Utc::now(),
            priority,
        }
    }

    /// Delay the job by `delay` from now
    pub fn scheduled_in(mut self, delay: Duration) -> Self {
        self.scheduled_at = Utc::now() + to_chrono(delay);
        self
    }
}

/// A job about to be enqueued
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// Tenant organization
    pub org_id: Uuid,
    /// Job kind
    pub kind: JobKind,
    /// Serialized payload
    pub payload: serde_json::Value,
    /// Queue placement
    pub options: EnqueueOptions,
}

impl JobRequest {
    /// Serializes `payload` into a request
    pub fn new<T: Serialize>(
        org_id: Uuid,
        kind: JobKind,
        payload: &T,
        options: EnqueueOptions,
    ) -> LifecycleResult<Self> {
        Ok(Self {
            org_id,
            kind,
            payload: serde_json::to_value(payload)?,
            options,
        })
    }
}

/// A job as handed to a worker
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    /// Job ID assigned by the queue
    pub id: Uuid,
    /// Tenant organization
    pub org_id: Uuid,
    /// Job kind
    pub kind: JobKind,
    /// Serialized payload
    pub payload: serde_json::Value,
    /// Queue placement
    pub options: EnqueueOptions,
    /// Failed attempts so far
    pub attempt: u32,
}

impl QueuedJob {
    /// Deserializes the payload
    pub fn decode<T: DeserializeOwned>(&self) -> LifecycleResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// What a worker tells the queue after running a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Job finished, remove it
    Done,
    /// Run the job again after the delay; not a failure
    Snooze(Duration),
}

/// Enqueue side of the job substrate
pub trait JobQueue: Send + Sync {
    /// Enqueue a job, returns its ID
    fn enqueue(&self, request: JobRequest) -> BoxFuture<'_, LifecycleResult<Uuid>>;
}

/// Worker side of the job substrate
pub trait Worker: Send + Sync {
    /// Kind of job this worker runs
    fn kind(&self) -> JobKind;

    /// Runs one job. An error lets the queue apply its retry policy.
    fn work<'a>(&'a self, job: &'a QueuedJob) -> BoxFuture<'a, LifecycleResult<WorkOutcome>>;
}

/// Converts a std delay for timestamp arithmetic, saturating at one year
pub(crate) fn to_chrono(delay: Duration) -> chrono::Duration {
    chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(365))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let org = Uuid::new_v4();
        let job = IndexCreationJob {
            org_id: org,
            indexes: vec![ConcreteIndex::new("t", ["a", "b"], ["c"])],
            resubmissions: 0,
        };

        let request = JobRequest::new(
            org,
            JobKind::IndexCreation,
            &job,
            EnqueueOptions::for_org(org, 1),
        )
        .unwrap();
        assert_eq!(request.options.queue, org.to_string());

        let queued = QueuedJob {
            id: Uuid::new_v4(),
            org_id: org,
            kind: request.kind,
            payload: request.payload,
            options: request.options,
            attempt: 0,
        };
        assert_eq!(queued.decode::<IndexCreationJob>().unwrap(), job);
    }

    #[test]
    fn test_decode_wrong_payload() {
        let queued = QueuedJob {
            id: Uuid::new_v4(),
            org_id: Uuid::nil(),
            kind: JobKind::IndexCreationStatus,
            payload: serde_json::json!({"unexpected": true}),
            options: EnqueueOptions::for_org(Uuid::nil(), 1),
            attempt: 0,
        };
        assert!(queued.decode::<IndexStatusJob>().is_err());
    }

    #[test]
    fn test_scheduled_in_is_in_the_future() {
        let now = Utc::now();
        let options = EnqueueOptions::for_org(Uuid::nil(), 1).scheduled_in(Duration::from_secs(30));
        assert!(options.scheduled_at >= now + chrono::Duration::seconds(29));
    }
}
