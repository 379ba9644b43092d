//! # Scenario Iterations
//!
//! Scenario CRUD and versioning live in the decision engine. The lifecycle
//! reads one iteration at a time to get its ASTs.

use std::collections::HashMap;
use std::sync::RwLock;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ast::Node;

use super::errors::{LifecycleError, LifecycleResult};

/// A rule of a scenario iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name
    #[serde(default)]
    pub name: String,
    /// Rule formula, absent while the rule is a draft
    #[serde(default)]
    pub formula: Option<Node>,
}

/// One version of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioIteration {
    /// Iteration ID
    #[serde(default)]
    pub id: Uuid,
    /// Owning organization
    #[serde(default)]
    pub org_id: Uuid,
    /// Trigger condition, absent while the iteration is a draft
    #[serde(default)]
    pub trigger_condition: Option<Node>,
    /// Rules
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl ScenarioIteration {
    /// Every AST of the iteration: trigger first, then rules in order
    pub fn asts(&self) -> impl Iterator<Item = &Node> {
        self.trigger_condition
            .iter()
            .chain(self.rules.iter().filter_map(|r| r.formula.as_ref()))
    }
}

/// Read access to scenario iterations
pub trait IterationRepository: Send + Sync {
    /// Fetch an iteration by ID
    fn get_iteration(&self, id: Uuid) -> BoxFuture<'_, LifecycleResult<ScenarioIteration>>;
}

/// In-memory iteration store
#[derive(Debug, Default)]
pub struct MemoryIterationRepository {
    iterations: RwLock<HashMap<Uuid, ScenarioIteration>>,
}

impl MemoryIterationRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an iteration, replacing any with the same ID
    pub fn insert(&self, iteration: ScenarioIteration) -> LifecycleResult<()> {
        let mut iterations = self
            .iterations
            .write()
            .map_err(|_| LifecycleError::Catalog("Lock poisoned".into()))?;
        iterations.insert(iteration.id, iteration);
        Ok(())
    }
}

impl IterationRepository for MemoryIterationRepository {
    fn get_iteration(&self, id: Uuid) -> BoxFuture<'_, LifecycleResult<ScenarioIteration>> {
        Box::pin(async move {
            let iterations = self
                .iterations
                .read()
                .map_err(|_| LifecycleError::Catalog("Lock poisoned".into()))?;
            iterations
                .get(&id)
                .cloned()
                .ok_or(LifecycleError::IterationNotFound(id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Function;

    #[test]
    fn test_asts_skip_drafts() {
        let iteration = ScenarioIteration {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            trigger_condition: Some(Node::constant(true)),
            rules: vec![
                Rule {
                    name: "draft".into(),
                    formula: None,
                },
                Rule {
                    name: "r1".into(),
                    formula: Some(Node::call(Function::And, vec![])),
                },
            ],
        };

        assert_eq!(iteration.asts().count(), 2);
    }

    #[test]
    fn test_iteration_from_json_defaults() {
        let iteration: ScenarioIteration = serde_json::from_str(r#"{"rules": []}"#).unwrap();
        assert!(iteration.id.is_nil());
        assert!(iteration.trigger_condition.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_iteration() {
        let repo = MemoryIterationRepository::new();
        let id = Uuid::new_v4();
        let err = repo.get_iteration(id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::IterationNotFound(missing) if missing == id));
    }
}
