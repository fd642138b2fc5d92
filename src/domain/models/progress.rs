use serde::{Deserialize, Serialize};

/// Durable summary of one user's completed attempt at one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub task_id: String,
    pub completed: bool,
    pub queries_used: u32,
    pub total_queries: u32,
    pub success: bool,
}

impl ProgressRecord {
    pub fn completed(
        task_id: impl Into<String>,
        queries_used: u32,
        total_queries: u32,
        success: bool,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            completed: true,
            queries_used,
            total_queries,
            success,
        }
    }
}

/// Build the storage key for a user's progress map.
pub fn progress_user_key(user_name: &str) -> String {
    format!("taskProgress_{}", user_name.trim())
}
