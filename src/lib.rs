//! Blackbox - budgeted black-box probing sessions
//!
//! A participant probes an unknown input→output rule by issuing batched
//! queries against a remote oracle and submitting natural-language
//! hypotheses, within a query budget and a per-round time limit.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Session state machine pieces, errors and ports
//! - **Adapters** (`adapters`): HTTP oracle, SQLite and in-memory progress stores
//! - **Service Layer** (`services`): Session controller, round timer, catalog listing
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use blackbox::services::TaskSessionController;
//!
//! let controller = TaskSessionController::start(oracle, store, "ada", &task, round).await?;
//! controller.submit_query(vec!["7".into(), "8".into()]).await?;
//! let outcome = controller.submit_hypothesis("outputs 1 for odd numbers").await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, OracleError, SessionError};
pub use domain::models::{
    Config, ProgressRecord, QueryLedger, SessionStatus, TaskCatalog, TaskCategory,
    TaskDescriptor, TaskSession, Verdict,
};
pub use domain::ports::{Oracle, ProgressStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CatalogService, RoundTimer, TaskSessionController};
