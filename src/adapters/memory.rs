//! In-memory progress store for tests and ephemeral runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ProgressRecord;
use crate::domain::ports::ProgressStore;

/// Progress keyed by user key, then task id.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    records: Arc<RwLock<HashMap<String, HashMap<String, ProgressRecord>>>>,
    writes: Arc<RwLock<usize>>,
    fail_writes: Arc<RwLock<u32>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls so far.
    pub async fn write_count(&self) -> usize {
        *self.writes.read().await
    }

    /// Make the next `n` writes fail with a database error.
    pub async fn fail_next_writes(&self, n: u32) {
        *self.fail_writes.write().await = n;
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get(&self, user_key: &str) -> DomainResult<HashMap<String, ProgressRecord>> {
        let records = self.records.read().await;
        Ok(records.get(user_key).cloned().unwrap_or_default())
    }

    async fn put(&self, user_key: &str, task_id: &str, record: ProgressRecord) -> DomainResult<()> {
        {
            let mut failures = self.fail_writes.write().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(DomainError::DatabaseError("simulated write failure".to_string()));
            }
        }

        let mut records = self.records.write().await;
        records
            .entry(user_key.to_string())
            .or_default()
            .insert(task_id.to_string(), record);
        *self.writes.write().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = InMemoryProgressStore::new();
        store
            .put("taskProgress_ada", "is_prime", ProgressRecord::completed("is_prime", 3, 10, true))
            .await
            .unwrap();

        assert_eq!(store.get("taskProgress_ada").await.unwrap().len(), 1);
        assert!(store.get("taskProgress_bob").await.unwrap().is_empty());
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let store = InMemoryProgressStore::new();
        store.fail_next_writes(1).await;
        let record = ProgressRecord::completed("t", 1, 1, false);

        assert_err!(store.put("u", "t", record.clone()).await);
        assert_ok!(store.put("u", "t", record).await);
        assert_eq!(store.write_count().await, 1);
    }
}
