//! Common test utilities for integration tests
//!
//! Shared fixtures for driving a task session against the scripted oracle
//! and an in-memory progress store.

use std::sync::Arc;
use std::time::Duration;

use blackbox::adapters::{InMemoryProgressStore, MockOracle};
use blackbox::domain::models::{TaskCategory, TaskDescriptor};
use blackbox::services::TaskSessionController;

pub const ROUND: Duration = Duration::from_secs(180);

/// A started session plus handles on its collaborators.
pub struct Harness {
    pub controller: Arc<TaskSessionController>,
    pub oracle: MockOracle,
    pub store: Arc<InMemoryProgressStore>,
}

pub fn descriptor(total_queries: u32, query_batch_size: u32) -> TaskDescriptor {
    TaskDescriptor::new("odd", TaskCategory::Numerical, total_queries, query_batch_size)
}

/// Start a session on a task with the given budget.
pub async fn start_session(total_queries: u32, query_batch_size: u32) -> Harness {
    let oracle = MockOracle::new(total_queries, query_batch_size);
    let store = Arc::new(InMemoryProgressStore::new());
    let controller = TaskSessionController::start(
        Arc::new(oracle.clone()),
        store.clone(),
        "ada",
        &descriptor(total_queries, query_batch_size),
        ROUND,
    )
    .await
    .expect("session should start");

    Harness {
        controller,
        oracle,
        store,
    }
}

pub fn inputs(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
