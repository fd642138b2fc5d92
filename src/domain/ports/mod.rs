//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - Oracle: the remote evaluator holding the hidden rule
//! - ProgressStore: durable per-user completion records
//!
//! These traits keep the session controller independent of HTTP and storage.

pub mod oracle;
pub mod progress_store;

pub use oracle::{
    EndTaskRequest, HypothesisRequest, HypothesisResponse, Oracle, QueryRequest, QueryResponse,
    QueryResult, StartTaskRequest, StartTaskResponse,
};
pub use progress_store::ProgressStore;
