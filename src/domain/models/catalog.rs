//! Static task catalog, loaded from a `tasks.json` document.
//!
//! The document groups tasks by category:
//!
//! ```json
//! { "numerical": [{ "id": "is_prime", "total_queries": 20, "query_batch_size": 3 }],
//!   "lexical":   [{ "id": "ends_with_vowel", "total_queries": 20, "query_batch_size": 3 }] }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::task::{TaskCategory, TaskDescriptor};
use crate::domain::errors::{DomainError, DomainResult};

#[derive(Debug, Deserialize, Serialize)]
struct CatalogEntry {
    id: String,
    total_queries: u32,
    query_batch_size: u32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CatalogDocument {
    #[serde(default)]
    numerical: Vec<CatalogEntry>,
    #[serde(default)]
    lexical: Vec<CatalogEntry>,
}

/// Ordered list of task descriptors, numerical tasks first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCatalog {
    tasks: Vec<TaskDescriptor>,
}

impl TaskCatalog {
    pub fn new(tasks: Vec<TaskDescriptor>) -> DomainResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for task in &tasks {
            task.validate().map_err(DomainError::ValidationFailed)?;
            if !seen.insert(task.id.as_str()) {
                return Err(DomainError::ValidationFailed(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
        }
        Ok(Self { tasks })
    }

    /// Parse a catalog document.
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        let entries = doc
            .numerical
            .into_iter()
            .map(|e| (TaskCategory::Numerical, e))
            .chain(doc.lexical.into_iter().map(|e| (TaskCategory::Lexical, e)));

        Self::new(
            entries
                .map(|(category, e)| {
                    TaskDescriptor::new(e.id, category, e.total_queries, e.query_batch_size)
                })
                .collect(),
        )
    }

    /// Load and parse a catalog document from disk.
    pub fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DomainError::Io(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn find(&self, task_id: &str) -> Option<&TaskDescriptor> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn by_category(&self, category: TaskCategory) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter().filter(move |t| t.category == category)
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
