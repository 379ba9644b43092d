//! Metrics registry for rulegate
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Atomic, lock-free increments

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of the advisor and the index lifecycle
#[derive(Debug, Default)]
pub struct AdvisorMetrics {
    /// Pipeline runs that produced advice
    advice_runs: AtomicU64,
    /// Pipeline runs rejected on an invalid AST
    advice_rejected: AtomicU64,
    /// Distinct query families extracted
    query_families: AtomicU64,
    /// Candidate families generated
    candidates: AtomicU64,
    /// Candidates already served by an existing index
    candidates_covered: AtomicU64,
    /// Indexes proposed for creation
    indexes_proposed: AtomicU64,
    /// Creation jobs enqueued (first submissions)
    jobs_enqueued: AtomicU64,
    /// Status checks that found work still pending
    status_snoozes: AtomicU64,
    /// Indexes confirmed built
    indexes_created: AtomicU64,
    /// Indexes submitted again after a failed build
    indexes_resubmitted: AtomicU64,
    /// Indexes given up on
    indexes_failed: AtomicU64,
}

impl AdvisorMetrics {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed pipeline run
    pub fn record_advice(&self, query_families: usize, candidates: usize, covered: usize, proposed: usize) {
        self.advice_runs.fetch_add(1, Ordering::Relaxed);
        self.query_families.fetch_add(query_families as u64, Ordering::Relaxed);
        self.candidates.fetch_add(candidates as u64, Ordering::Relaxed);
        self.candidates_covered.fetch_add(covered as u64, Ordering::Relaxed);
        self.indexes_proposed.fetch_add(proposed as u64, Ordering::Relaxed);
    }

    /// Increment rejected pipeline runs
    pub fn increment_advice_rejected(&self) {
        self.advice_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment enqueued creation jobs
    pub fn increment_jobs_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment snoozed status checks
    pub fn increment_status_snoozes(&self) {
        self.status_snoozes.fetch_add(1, Ordering::Relaxed);
    }

    /// Add confirmed indexes
    pub fn add_indexes_created(&self, n: usize) {
        self.indexes_created.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Add resubmitted indexes
    pub fn add_indexes_resubmitted(&self, n: usize) {
        self.indexes_resubmitted.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Add abandoned indexes
    pub fn add_indexes_failed(&self, n: usize) {
        self.indexes_failed.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            advice_runs: self.advice_runs.load(Ordering::Relaxed),
            advice_rejected: self.advice_rejected.load(Ordering::Relaxed),
            query_families: self.query_families.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            candidates_covered: self.candidates_covered.load(Ordering::Relaxed),
            indexes_proposed: self.indexes_proposed.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            status_snoozes: self.status_snoozes.load(Ordering::Relaxed),
            indexes_created: self.indexes_created.load(Ordering::Relaxed),
            indexes_resubmitted: self.indexes_resubmitted.load(Ordering::Relaxed),
            indexes_failed: self.indexes_failed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub advice_runs: u64,
    pub advice_rejected: u64,
    pub query_families: u64,
    pub candidates: u64,
    pub candidates_covered: u64,
    pub indexes_proposed: u64,
    pub jobs_enqueued: u64,
    pub status_snoozes: u64,
    pub indexes_created: u64,
    pub indexes_resubmitted: u64,
    pub indexes_failed: u64,
}
