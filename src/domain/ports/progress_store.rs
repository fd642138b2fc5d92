/// Progress store port (trait) for dependency injection.
///
/// A durable per-user map from task id to [`ProgressRecord`]. Writes replace
/// the whole record; concurrent writers for the same user and task race
/// last-writer-wins.
use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::ProgressRecord;

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All records stored under `user_key`, keyed by task id.
    ///
    /// An unknown user yields an empty map.
    async fn get(&self, user_key: &str) -> DomainResult<HashMap<String, ProgressRecord>>;

    /// Insert or overwrite the record for `(user_key, task_id)`.
    async fn put(&self, user_key: &str, task_id: &str, record: ProgressRecord) -> DomainResult<()>;
}
