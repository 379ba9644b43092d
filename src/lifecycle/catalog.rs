//! # Index Catalog
//!
//! The tenant's physical index catalog. Reads must reflect a recent,
//! committed view; creation is fire-and-forget because a build can take
//! hours on a large table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::advisor::ConcreteIndex;

use super::errors::{LifecycleError, LifecycleResult};

/// Physical index catalog of every tenant schema
pub trait IndexCatalog: Send + Sync {
    /// Fully built, valid indexes of one table
    fn list_all_valid_indexes<'a>(
        &'a self,
        org_id: Uuid,
        table: &'a str,
    ) -> BoxFuture<'a, LifecycleResult<Vec<ConcreteIndex>>>;

    /// Indexes whose build has started and not finished
    fn list_indices_pending_creation(
        &self,
        org_id: Uuid,
    ) -> BoxFuture<'_, LifecycleResult<Vec<ConcreteIndex>>>;

    /// Starts building the indexes and returns without waiting.
    ///
    /// Must behave as "create if not exists".
    fn create_indexes_async<'a>(
        &'a self,
        org_id: Uuid,
        indexes: &'a [ConcreteIndex],
    ) -> BoxFuture<'a, LifecycleResult<()>>;
}

#[derive(Debug, Default)]
struct TenantIndexes {
    valid: Vec<ConcreteIndex>,
    pending: Vec<ConcreteIndex>,
}

impl TenantIndexes {
    fn knows(&self, index: &ConcreteIndex) -> bool {
        self.valid
            .iter()
            .chain(self.pending.iter())
            .any(|i| i.same_definition(index))
    }
}

/// In-memory catalog.
///
/// Builds stay pending until [`MemoryCatalog::finish_builds`] or
/// [`MemoryCatalog::fail_builds`] is called, unless the catalog was created
/// with [`MemoryCatalog::instant`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tenants: Mutex<HashMap<Uuid, TenantIndexes>>,
    instant_builds: bool,
    create_calls: AtomicUsize,
}

impl MemoryCatalog {
    /// Create an empty catalog whose builds stay pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty catalog whose builds complete immediately
    pub fn instant() -> Self {
        Self {
            instant_builds: true,
            ..Default::default()
        }
    }

    fn tenants(&self) -> LifecycleResult<MutexGuard<'_, HashMap<Uuid, TenantIndexes>>> {
        self.tenants
            .lock()
            .map_err(|_| LifecycleError::Catalog("Lock poisoned".into()))
    }

    /// Registers an already built index
    pub fn add_valid(&self, org_id: Uuid, index: ConcreteIndex) -> LifecycleResult<()> {
        let mut tenants = self.tenants()?;
        tenants.entry(org_id).or_default().valid.push(index.normalized());
        Ok(())
    }

    /// Completes every pending build of a tenant, returns how many
    pub fn finish_builds(&self, org_id: Uuid) -> LifecycleResult<usize> {
        let mut tenants = self.tenants()?;
        let tenant = tenants.entry(org_id).or_default();
        let done = std::mem::take(&mut tenant.pending);
        let n = done.len();
        tenant.valid.extend(done);
        Ok(n)
    }

    /// Aborts every pending build of a tenant, returns how many
    pub fn fail_builds(&self, org_id: Uuid) -> LifecycleResult<usize> {
        let mut tenants = self.tenants()?;
        let tenant = tenants.entry(org_id).or_default();
        Ok(std::mem::take(&mut tenant.pending).len())
    }

    /// Number of `create_indexes_async` calls so far
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    /// Every valid index of a tenant, all tables
    pub fn valid_indexes(&self, org_id: Uuid) -> LifecycleResult<Vec<ConcreteIndex>> {
        let tenants = self.tenants()?;
        Ok(tenants
            .get(&org_id)
            .map(|t| t.valid.clone())
            .unwrap_or_default())
    }
}

impl IndexCatalog for MemoryCatalog {
    fn list_all_valid_indexes<'a>(
        &'a self,
        org_id: Uuid,
        table: &'a str,
    ) -> BoxFuture<'a, LifecycleResult<Vec<ConcreteIndex>>> {
        Box::pin(async move {
            let tenants = self.tenants()?;
            Ok(tenants
                .get(&org_id)
                .map(|t| t.valid.iter().filter(|i| i.table == table).cloned().collect())
                .unwrap_or_default())
        })
    }

    fn list_indices_pending_creation(
        &self,
        org_id: Uuid,
    ) -> BoxFuture<'_, LifecycleResult<Vec<ConcreteIndex>>> {
        Box::pin(async move {
            let tenants = self.tenants()?;
            Ok(tenants
                .get(&org_id)
                .map(|t| t.pending.clone())
                .unwrap_or_default())
        })
    }

    fn create_indexes_async<'a>(
        &'a self,
        org_id: Uuid,
        indexes: &'a [ConcreteIndex],
    ) -> BoxFuture<'a, LifecycleResult<()>> {
        Box::pin(async move {
            self.create_calls.fetch_add(1, Ordering::Relaxed);

            let mut tenants = self.tenants()?;
            let tenant = tenants.entry(org_id).or_default();
            for index in indexes {
                let index = index.normalized();
                if tenant.knows(&index) {
                    continue;
                }
                if self.instant_builds {
                    tenant.valid.push(index);
                } else {
                    tenant.pending.push(index);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(cols: &[&str]) -> ConcreteIndex {
        ConcreteIndex::new("transactions", cols, ["amount"])
    }

    #[tokio::test]
    async fn test_create_then_finish() {
        let catalog = MemoryCatalog::new();
        let org = Uuid::new_v4();

        catalog.create_indexes_async(org, &[idx(&["a"])]).await.unwrap();
        assert_eq!(catalog.list_indices_pending_creation(org).await.unwrap().len(), 1);
        assert!(catalog
            .list_all_valid_indexes(org, "transactions")
            .await
            .unwrap()
            .is_empty());

        assert_eq!(catalog.finish_builds(org).unwrap(), 1);
        assert!(catalog.list_indices_pending_creation(org).await.unwrap().is_empty());
        assert_eq!(
            catalog.list_all_valid_indexes(org, "transactions").await.unwrap(),
            vec![idx(&["a"])]
        );
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let catalog = MemoryCatalog::new();
        let org = Uuid::new_v4();

        catalog.create_indexes_async(org, &[idx(&["a"])]).await.unwrap();
        catalog.create_indexes_async(org, &[idx(&["a"])]).await.unwrap();
        assert_eq!(catalog.list_indices_pending_creation(org).await.unwrap().len(), 1);
        assert_eq!(catalog.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_create_calls_counted_across_concurrent_calls() {
        let catalog = MemoryCatalog::instant();
        let org = Uuid::new_v4();
        let batch = [idx(&["a"])];

        let results = futures_util::future::join_all(
            (0..8).map(|_| catalog.create_indexes_async(org, &batch)),
        )
        .await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(catalog.create_calls(), 8);
        assert_eq!(catalog.valid_indexes(org).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let catalog = MemoryCatalog::instant();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        catalog.create_indexes_async(a, &[idx(&["a"])]).await.unwrap();
        assert_eq!(catalog.valid_indexes(a).unwrap().len(), 1);
        assert!(catalog.valid_indexes(b).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_builds_disappear() {
        let catalog = MemoryCatalog::new();
        let org = Uuid::new_v4();

        catalog.create_indexes_async(org, &[idx(&["a"])]).await.unwrap();
        assert_eq!(catalog.fail_builds(org).unwrap(), 1);
        assert!(catalog.list_indices_pending_creation(org).await.unwrap().is_empty());
        assert!(catalog.valid_indexes(org).unwrap().is_empty());
    }
}
