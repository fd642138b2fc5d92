//! Task descriptors as supplied by the task catalog.

use serde::{Deserialize, Serialize};

/// Category of a black-box task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    /// Rules over numbers and integer tuples
    Numerical,
    /// Rules over strings treated as character sequences
    Lexical,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numerical => "numerical",
            Self::Lexical => "lexical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "numerical" => Some(Self::Numerical),
            "lexical" => Some(Self::Lexical),
            _ => None,
        }
    }

    /// All categories in catalog display order.
    pub fn all() -> [Self; 2] {
        [Self::Numerical, Self::Lexical]
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only description of one task. Immutable for a session's duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    pub category: TaskCategory,
    /// Total query budget for the task (> 0)
    pub total_queries: u32,
    /// Maximum inputs per query call (> 0)
    pub query_batch_size: u32,
}

impl TaskDescriptor {
    pub fn new(
        id: impl Into<String>,
        category: TaskCategory,
        total_queries: u32,
        query_batch_size: u32,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            total_queries,
            query_batch_size,
        }
    }

    /// Check the budget parameters are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("task id cannot be empty".to_string());
        }
        if self.total_queries == 0 {
            return Err(format!("task '{}': total_queries must be positive", self.id));
        }
        if self.query_batch_size == 0 {
            return Err(format!(
                "task '{}': query_batch_size must be positive",
                self.id
            ));
        }
        Ok(())
    }
}
