//! Oracle port: the remote evaluator that holds the hidden rule.
//!
//! Four request/response operations with JSON-shaped payloads. Adapters
//! report failures as [`OracleError`]; a rejected request and an unreachable
//! oracle are both retryable from the session's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::OracleError;
use crate::domain::models::{SampleCases, TaskCategory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTaskRequest {
    pub user_name: String,
    pub task_id: String,
    pub task_category: TaskCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTaskResponse {
    pub session_id: String,
    pub input_spec: String,
    pub output_spec: String,
    #[serde(default)]
    pub sample_cases: SampleCases,
    #[serde(default)]
    pub test_cases_count: u32,
    pub total_queries: u32,
    pub query_batch_size: u32,
    /// Ground-truth rule text, withheld from the participant until completion
    #[serde(default)]
    pub rule_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub session_id: String,
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub input: String,
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
    /// Cumulative count of real queries for the session
    pub queries_used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_remaining: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisRequest {
    pub session_id: String,
    pub hypothesis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisResponse {
    pub success: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_complete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTaskRequest {
    pub session_id: String,
}

/// Remote evaluator contract.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Open a session for a task. Errors mean no session exists.
    async fn start_task(&self, request: StartTaskRequest) -> Result<StartTaskResponse, OracleError>;

    /// Evaluate a batch of inputs against the hidden rule.
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, OracleError>;

    /// Judge a natural-language hypothesis.
    async fn submit_hypothesis(
        &self,
        request: HypothesisRequest,
    ) -> Result<HypothesisResponse, OracleError>;

    /// Tell the oracle the session is over. Callers ignore failures.
    async fn end_task(&self, request: EndTaskRequest) -> Result<(), OracleError>;
}
