//! Domain errors for the blackbox session system.

use thiserror::Error;

/// Domain-level errors raised by storage, catalog and serialization code.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Task not found in catalog: {0}")]
    TaskNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

/// Errors at the oracle boundary.
///
/// The adapter distinguishes an explicit rejection from an unreachable
/// oracle; the session controller treats both as transient.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle answered with an `{ "error": ... }` payload
    #[error("Oracle rejected the request: {0}")]
    Rejected(String),

    /// The oracle could not be reached or timed out
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// The oracle answered with a body that does not match the protocol
    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),
}

/// Outcome errors of task session events.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to start task {task_id}: {source}")]
    StartFailed {
        task_id: String,
        #[source]
        source: OracleError,
    },

    #[error("Please enter at least one input to query")]
    EmptyBatch,

    #[error("Batch size {size} exceeds limit. You may query at most {limit} inputs")]
    BatchTooLarge { size: u32, limit: u32 },

    #[error("Only {remaining} queries remaining, requested {requested}")]
    OutOfBudget { requested: u32, remaining: u32 },

    #[error("Please enter your hypothesis")]
    BlankHypothesis,

    #[error("Run another query before submitting a new hypothesis")]
    HypothesisOutOfTurn,

    #[error("A {0} call is already in flight for this session")]
    CallInFlight(&'static str),

    #[error("Task is already completed")]
    SessionCompleted,

    #[error("Task session has been ended")]
    SessionEnded,

    #[error("Oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Inconsistent oracle response: {0}")]
    InconsistentOracle(String),

    #[error("Failed to record progress: {0}")]
    Progress(#[from] DomainError),
}

impl SessionError {
    /// Rejected locally before any oracle call; no state was touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SessionError::EmptyBatch
                | SessionError::BatchTooLarge { .. }
                | SessionError::OutOfBudget { .. }
                | SessionError::BlankHypothesis
                | SessionError::HypothesisOutOfTurn
                | SessionError::CallInFlight(_)
                | SessionError::SessionCompleted
                | SessionError::SessionEnded
        )
    }

    /// The oracle call failed; the round is unchanged and may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::Oracle(_) | SessionError::InconsistentOracle(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_disjoint() {
        let precondition = SessionError::BatchTooLarge { size: 4, limit: 3 };
        assert!(precondition.is_precondition());
        assert!(!precondition.is_transient());

        let transient = SessionError::Oracle(OracleError::Unavailable("refused".into()));
        assert!(transient.is_transient());
        assert!(!transient.is_precondition());

        let start = SessionError::StartFailed {
            task_id: "is_prime".into(),
            source: OracleError::Rejected("unknown task".into()),
        };
        assert!(!start.is_precondition());
        assert!(!start.is_transient());
    }

    #[test]
    fn test_messages() {
        let err = SessionError::BatchTooLarge { size: 5, limit: 3 };
        assert_eq!(
            err.to_string(),
            "Batch size 5 exceeds limit. You may query at most 3 inputs"
        );
        let err: SessionError = DomainError::DatabaseError("locked".into()).into();
        assert_eq!(err.to_string(), "Failed to record progress: Database error: locked");
    }
}
