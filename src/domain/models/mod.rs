pub mod catalog;
pub mod config;
pub mod hypothesis;
pub mod ledger;
pub mod progress;
pub mod session;
pub mod task;

pub use catalog::TaskCatalog;
pub use config::{
    CatalogConfig, Config, DatabaseConfig, LoggingConfig, OracleConfig, TimerConfig,
};
pub use hypothesis::{HypothesisGate, Verdict};
pub use ledger::QueryLedger;
pub use progress::{progress_user_key, ProgressRecord};
pub use session::{
    QueryRecord, SampleCases, SessionStatus, SubmissionRecord, TaskSession, TIMEOUT_INPUT,
    TIMEOUT_OUTPUT,
};
pub use task::{TaskCategory, TaskDescriptor};
