//! Index Lifecycle Tests
//!
//! Tests for the asynchronous index flow:
//! - Advice → creation job → status checks → done
//! - Status checks snooze while builds run
//! - Lost builds are resubmitted a bounded number of times
//! - Denied callers and invalid rules touch neither catalog nor queue
//! - Queues are per organization

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rulegate::advisor::ConcreteIndex;
use rulegate::ast::Node;
use rulegate::lifecycle::{
    Credentials, IndexCatalog, IndexCreationJob, IndexOrchestrator, JobKind, LifecycleConfig,
    LifecycleError, MemoryCatalog, MemoryIterationRepository, MemoryJobQueue, Role, RolePermissions, Rule,
    ScenarioIteration, Worker,
};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

struct Harness {
    org: Uuid,
    iteration_id: Uuid,
    catalog: Arc<MemoryCatalog>,
    queue: Arc<MemoryJobQueue>,
    orchestrator: IndexOrchestrator,
    now: DateTime<Utc>,
}

impl Harness {
    fn new(formulas: Vec<Node>) -> Self {
        Self::with_config(formulas, LifecycleConfig::default())
    }

    fn with_config(formulas: Vec<Node>, config: LifecycleConfig) -> Self {
        let org = Uuid::new_v4();
        let iteration_id = Uuid::new_v4();
        let catalog = Arc::new(MemoryCatalog::new());
        let queue = Arc::new(MemoryJobQueue::new());

        let repository = MemoryIterationRepository::new();
        repository
            .insert(ScenarioIteration {
                id: iteration_id,
                org_id: org,
                trigger_condition: None,
                rules: formulas
                    .into_iter()
                    .enumerate()
                    .map(|(i, formula)| Rule {
                        name: format!("rule_{}", i),
                        formula: Some(formula),
                    })
                    .collect(),
            })
            .unwrap();

        let orchestrator = IndexOrchestrator::new(
            catalog.clone(),
            queue.clone(),
            Arc::new(repository),
            Arc::new(RolePermissions),
            config,
        );

        Self {
            org,
            iteration_id,
            catalog,
            queue,
            orchestrator,
            now: Utc::now(),
        }
    }

    fn publisher(&self) -> Credentials {
        Credentials::new(self.org, Role::Publisher)
    }

    /// Advances the clock past every scheduled job, then runs one pass
    async fn step(&mut self) {
        self.now += Duration::hours(1);
        let creation = self.orchestrator.creation_worker();
        let status = self.orchestrator.status_worker();
        let workers: [&dyn Worker; 2] = [&creation, &status];
        self.queue.run_due(&workers, self.now).await.unwrap();
    }

    fn queued_kinds(&self) -> Vec<JobKind> {
        self.queue.jobs().iter().map(|j| j.kind).collect()
    }
}

fn velocity(field: &str, range: &str) -> Node {
    Node::aggregator(
        "transactions",
        field,
        vec![
            Node::filter("transactions", "account_id", "=", json!("acc")),
            Node::filter("transactions", range, ">", json!("2024-01-01")),
        ],
    )
}

// =============================================================================
// Happy Path
// =============================================================================

/// Advice is submitted, polled while building, then confirmed.
#[tokio::test]
async fn test_full_flow() {
    let mut h = Harness::new(vec![velocity("amount", "created_at")]);

    let advice = h
        .orchestrator
        .ensure_indexes_for_iteration(&h.publisher(), h.iteration_id)
        .await
        .unwrap();
    assert_eq!(
        advice.to_create,
        vec![ConcreteIndex::new(
            "transactions",
            ["account_id", "created_at"],
            ["amount"]
        )]
    );
    assert_eq!(h.queued_kinds(), vec![JobKind::IndexCreation]);

    // Creation job submits and schedules a status check
    h.step().await;
    assert_eq!(h.catalog.create_calls(), 1);
    assert_eq!(h.queued_kinds(), vec![JobKind::IndexCreationStatus]);

    // Build still running: snooze
    h.step().await;
    h.step().await;
    assert_eq!(h.queued_kinds(), vec![JobKind::IndexCreationStatus]);
    assert_eq!(h.orchestrator.metrics().snapshot().status_snoozes, 2);

    // Build done
    h.catalog.finish_builds(h.org).unwrap();
    h.step().await;
    assert!(h.queue.is_empty());

    let snap = h.orchestrator.metrics().snapshot();
    assert_eq!(snap.jobs_enqueued, 1);
    assert_eq!(snap.indexes_created, 1);
    assert_eq!(snap.indexes_failed, 0);

    // Nothing left to advise
    let again = h
        .orchestrator
        .get_indexes_to_create(&h.publisher(), h.iteration_id)
        .await
        .unwrap();
    assert!(again.to_create.is_empty());
}

/// Pending builds are reported to the caller.
#[tokio::test]
async fn test_num_pending_reported() {
    let mut h = Harness::new(vec![velocity("amount", "created_at")]);
    h.orchestrator
        .ensure_indexes_for_iteration(&h.publisher(), h.iteration_id)
        .await
        .unwrap();
    h.step().await;

    let advice = h
        .orchestrator
        .get_indexes_to_create(&h.publisher(), h.iteration_id)
        .await
        .unwrap();

    // Still pending, so not valid yet: advised again, flagged as pending
    assert_eq!(advice.num_pending, 1);
    assert_eq!(advice.to_create.len(), 1);
}

/// A mixed-case submission is tracked as the same index the catalog builds.
#[tokio::test]
async fn test_mixed_case_submission() {
    let mut h = Harness::new(vec![]);
    let requested = ConcreteIndex {
        table: "Transactions".into(),
        indexed: vec!["Account_Id".into()],
        included: Default::default(),
    };

    h.orchestrator
        .create_indexes_async(&h.publisher(), h.org, vec![requested])
        .await
        .unwrap();

    // Payload is stored normalized
    let queued = h.queue.jobs();
    let payload: IndexCreationJob = queued[0].decode().unwrap();
    assert_eq!(
        payload.indexes,
        vec![ConcreteIndex::new("transactions", ["account_id"], Vec::<String>::new())]
    );

    // Build running: the status check snoozes instead of resubmitting
    h.step().await;
    h.step().await;
    assert_eq!(h.queued_kinds(), vec![JobKind::IndexCreationStatus]);
    assert_eq!(h.orchestrator.metrics().snapshot().status_snoozes, 1);

    // Build done: confirmed, never counted as failed
    h.catalog.finish_builds(h.org).unwrap();
    h.step().await;
    assert!(h.queue.is_empty());
    assert_eq!(h.catalog.create_calls(), 1);

    let snap = h.orchestrator.metrics().snapshot();
    assert_eq!(snap.indexes_created, 1);
    assert_eq!(snap.indexes_resubmitted, 0);
    assert_eq!(snap.indexes_failed, 0);
}

// =============================================================================
// Failures & Resubmission
// =============================================================================

/// A lost build is resubmitted once, then given up on.
#[tokio::test]
async fn test_single_resubmission() {
    let mut h = Harness::new(vec![velocity("amount", "created_at")]);
    h.orchestrator
        .ensure_indexes_for_iteration(&h.publisher(), h.iteration_id)
        .await
        .unwrap();

    h.step().await;
    h.catalog.fail_builds(h.org).unwrap();
    h.step().await;
    assert_eq!(h.queued_kinds(), vec![JobKind::IndexCreation]);

    h.step().await;
    h.catalog.fail_builds(h.org).unwrap();
    h.step().await;

    assert!(h.queue.is_empty());
    assert_eq!(h.catalog.create_calls(), 2);
    let snap = h.orchestrator.metrics().snapshot();
    assert_eq!(snap.indexes_resubmitted, 1);
    assert_eq!(snap.indexes_failed, 1);
}

/// A resubmitted build that succeeds completes normally.
#[tokio::test]
async fn test_resubmission_recovers() {
    let mut h = Harness::new(vec![velocity("amount", "created_at")]);
    h.orchestrator
        .ensure_indexes_for_iteration(&h.publisher(), h.iteration_id)
        .await
        .unwrap();

    h.step().await;
    h.catalog.fail_builds(h.org).unwrap();
    h.step().await;
    h.step().await;
    h.catalog.finish_builds(h.org).unwrap();
    h.step().await;

    assert!(h.queue.is_empty());
    assert_eq!(
        h.catalog
            .list_all_valid_indexes(h.org, "transactions")
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(h.orchestrator.metrics().snapshot().indexes_failed, 0);
}

/// With resubmission disabled a lost build fails immediately.
#[tokio::test]
async fn test_no_resubmission_configured() {
    let config = LifecycleConfig {
        max_resubmissions: 0,
        ..Default::default()
    };
    let mut h = Harness::with_config(vec![velocity("amount", "created_at")], config);
    h.orchestrator
        .ensure_indexes_for_iteration(&h.publisher(), h.iteration_id)
        .await
        .unwrap();

    h.step().await;
    h.catalog.fail_builds(h.org).unwrap();
    h.step().await;

    assert!(h.queue.is_empty());
    assert_eq!(h.orchestrator.metrics().snapshot().indexes_failed, 1);
}

// =============================================================================
// Authorization & Validation
// =============================================================================

/// A viewer cannot prepare indexes; nothing is read or queued.
#[tokio::test]
async fn test_viewer_denied() {
    let h = Harness::new(vec![velocity("amount", "created_at")]);
    let viewer = Credentials::new(h.org, Role::Viewer);

    let err = h
        .orchestrator
        .get_indexes_to_create(&viewer, h.iteration_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Unauthorized(_)));
    assert_eq!(err.status_code(), 403);

    let err = h
        .orchestrator
        .create_indexes_async(
            &viewer,
            h.org,
            vec![ConcreteIndex::new("transactions", ["a"], ["b"])],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Unauthorized(_)));
    assert!(h.queue.is_empty());
    assert_eq!(h.orchestrator.metrics().snapshot().advice_runs, 0);
}

/// One broken rule blocks the whole iteration.
#[tokio::test]
async fn test_invalid_rule_blocks_iteration() {
    let broken = Node::aggregator(
        "transactions",
        "amount",
        vec![Node::filter("transactions", "account_id", "~=", json!(1))],
    );
    let h = Harness::new(vec![velocity("amount", "created_at"), broken]);

    let err = h
        .orchestrator
        .ensure_indexes_for_iteration(&h.publisher(), h.iteration_id)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidAst(_)));
    assert!(!err.is_retryable());
    assert!(h.queue.is_empty());
}

/// Unknown iterations are reported as such.
#[tokio::test]
async fn test_unknown_iteration() {
    let h = Harness::new(vec![]);
    let err = h
        .orchestrator
        .get_indexes_to_create(&h.publisher(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// =============================================================================
// Tenancy
// =============================================================================

/// Jobs land on the queue of the organization they belong to.
#[tokio::test]
async fn test_jobs_on_org_queue() {
    let h = Harness::new(vec![velocity("amount", "created_at")]);
    h.orchestrator
        .ensure_indexes_for_iteration(&Credentials::service(), h.iteration_id)
        .await
        .unwrap();

    assert_eq!(h.queue.jobs_on(&h.org.to_string()).len(), 1);
    assert!(h.queue.jobs_on(&Uuid::new_v4().to_string()).is_empty());
}
