//! Domain layer for blackbox probing sessions
//!
//! This module contains the session state machine's pure building blocks
//! (budget ledger, hypothesis gate, task session), the catalog model and the
//! port traits implemented by the adapters.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult, OracleError, SessionError};
