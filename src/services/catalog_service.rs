//! Catalog listing joined with a user's progress.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{progress_user_key, ProgressRecord, TaskCatalog, TaskDescriptor};
use crate::domain::ports::ProgressStore;

/// One catalog task with the user's progress on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskListing {
    #[serde(flatten)]
    pub task: TaskDescriptor,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord>,
}

/// The whole catalog for one user, with a completion tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogListing {
    pub tasks: Vec<TaskListing>,
    pub completed: usize,
    pub total: usize,
}

impl CatalogListing {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

pub struct CatalogService {
    catalog: Arc<TaskCatalog>,
    store: Arc<dyn ProgressStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<TaskCatalog>, store: Arc<dyn ProgressStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn resolve(&self, task_id: &str) -> DomainResult<TaskDescriptor> {
        self.catalog
            .find(task_id)
            .cloned()
            .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))
    }

    pub async fn list(&self, user_name: &str) -> DomainResult<CatalogListing> {
        let mut progress = self.store.get(&progress_user_key(user_name)).await?;

        let tasks: Vec<TaskListing> = self
            .catalog
            .tasks()
            .iter()
            .map(|task| {
                let record = progress.remove(&task.id);
                TaskListing {
                    task: task.clone(),
                    completed: record.as_ref().is_some_and(|r| r.completed),
                    progress: record,
                }
            })
            .collect();

        let completed = tasks.iter().filter(|t| t.completed).count();
        Ok(CatalogListing {
            total: tasks.len(),
            completed,
            tasks,
        })
    }

    /// Pick uniformly among tasks the user has not completed.
    ///
    /// `None` means every task is done.
    pub async fn random_incomplete(&self, user_name: &str) -> DomainResult<Option<TaskDescriptor>> {
        let incomplete = self.incomplete(user_name).await?;
        Ok(incomplete.choose(&mut rand::thread_rng()).cloned())
    }

    pub async fn random_incomplete_with<R: Rng + ?Sized>(
        &self,
        user_name: &str,
        rng: &mut R,
    ) -> DomainResult<Option<TaskDescriptor>> {
        let incomplete = self.incomplete(user_name).await?;
        Ok(incomplete.choose(rng).cloned())
    }

    async fn incomplete(&self, user_name: &str) -> DomainResult<Vec<TaskDescriptor>> {
        let listing = self.list(user_name).await?;
        Ok(listing
            .tasks
            .into_iter()
            .filter(|t| !t.completed)
            .map(|t| t.task)
            .collect())
    }
}
