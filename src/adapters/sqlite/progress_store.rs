//! SQLite implementation of the ProgressStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ProgressRecord;
use crate::domain::ports::ProgressStore;

#[derive(Clone)]
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn get(&self, user_key: &str) -> DomainResult<HashMap<String, ProgressRecord>> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            "SELECT task_id, completed, queries_used, total_queries, success FROM task_progress WHERE user_key = ? ORDER BY task_id"
        )
        .bind(user_key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| ProgressRecord::try_from(r).map(|rec| (rec.task_id.clone(), rec)))
            .collect()
    }

    async fn put(&self, user_key: &str, task_id: &str, record: ProgressRecord) -> DomainResult<()> {
        if record.task_id != task_id {
            return Err(DomainError::ValidationFailed(format!(
                "record for task '{}' stored under '{task_id}'",
                record.task_id
            )));
        }

        sqlx::query(
            r#"INSERT INTO task_progress (user_key, task_id, completed, queries_used, total_queries, success, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user_key, task_id) DO UPDATE SET
                   completed = excluded.completed,
                   queries_used = excluded.queries_used,
                   total_queries = excluded.total_queries,
                   success = excluded.success,
                   updated_at = excluded.updated_at"#
        )
        .bind(user_key)
        .bind(task_id)
        .bind(record.completed)
        .bind(i64::from(record.queries_used))
        .bind(i64::from(record.total_queries))
        .bind(record.success)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    task_id: String,
    completed: bool,
    queries_used: i64,
    total_queries: i64,
    success: bool,
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = DomainError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        let count = |v: i64, field: &str| {
            u32::try_from(v).map_err(|_| {
                DomainError::SerializationError(format!("Invalid {field} for task {}: {v}", row.task_id))
            })
        };

        Ok(ProgressRecord {
            queries_used: count(row.queries_used, "queries_used")?,
            total_queries: count(row.total_queries, "total_queries")?,
            completed: row.completed,
            success: row.success,
            task_id: row.task_id,
        })
    }
}
