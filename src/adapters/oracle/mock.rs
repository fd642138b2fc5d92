//! Scripted oracle for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::OracleError;
use crate::domain::models::SampleCases;
use crate::domain::ports::{
    EndTaskRequest, HypothesisRequest, HypothesisResponse, Oracle, QueryRequest, QueryResponse,
    QueryResult, StartTaskRequest, StartTaskResponse,
};

type Rule = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Call counts observed by the mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub start: usize,
    pub query: usize,
    pub hypothesis: usize,
    pub end: usize,
}

struct MockState {
    start_response: StartTaskResponse,
    fail_start: Option<OracleError>,
    queries_used: u32,
    query_failures: VecDeque<OracleError>,
    misreported_counts: VecDeque<u32>,
    hypothesis_replies: VecDeque<Result<HypothesisResponse, OracleError>>,
    fail_end: Option<OracleError>,
    query_delay: Option<Duration>,
    hypothesis_delay: Option<Duration>,
    calls: MockCalls,
    hypotheses: Vec<String>,
}

/// Oracle whose behaviour is scripted by the test.
///
/// Queries are answered by applying a rule closure to each input. The
/// cumulative `queries_used` count is tracked like a real backend. Unscripted
/// hypotheses are judged incorrect.
#[derive(Clone)]
pub struct MockOracle {
    state: Arc<Mutex<MockState>>,
    rule: Rule,
}

impl MockOracle {
    pub fn new(total_queries: u32, query_batch_size: u32) -> Self {
        let mut sample_cases = SampleCases::new();
        sample_cases.insert("2".to_string(), Value::from(1));
        sample_cases.insert("4".to_string(), Value::from(0));

        let start_response = StartTaskResponse {
            session_id: String::new(),
            input_spec: "A single integer".to_string(),
            output_spec: "1 if the rule holds, otherwise 0".to_string(),
            sample_cases,
            test_cases_count: 10,
            total_queries,
            query_batch_size,
            rule_description: "Outputs 1 for odd integers and 0 otherwise".to_string(),
        };

        Self {
            state: Arc::new(Mutex::new(MockState {
                start_response,
                fail_start: None,
                queries_used: 0,
                query_failures: VecDeque::new(),
                misreported_counts: VecDeque::new(),
                hypothesis_replies: VecDeque::new(),
                fail_end: None,
                query_delay: None,
                hypothesis_delay: None,
                calls: MockCalls::default(),
                hypotheses: Vec::new(),
            })),
            rule: Arc::new(|input: &str| {
                let odd = input.trim().parse::<i64>().is_ok_and(|n| n % 2 != 0);
                Value::from(i64::from(odd))
            }),
        }
    }

    pub fn with_rule(mut self, rule: impl Fn(&str) -> Value + Send + Sync + 'static) -> Self {
        self.rule = Arc::new(rule);
        self
    }

    pub async fn set_start_response(&self, response: StartTaskResponse) {
        self.state.lock().await.start_response = response;
    }

    pub async fn fail_start(&self, error: OracleError) {
        self.state.lock().await.fail_start = Some(error);
    }

    /// Fail the next query call without counting it.
    pub async fn fail_next_query(&self, error: OracleError) {
        self.state.lock().await.query_failures.push_back(error);
    }

    /// Report `count` instead of the true cumulative total on the next query.
    pub async fn misreport_next_query(&self, count: u32) {
        self.state.lock().await.misreported_counts.push_back(count);
    }

    pub async fn push_hypothesis_reply(&self, success: bool, explanation: impl Into<String>) {
        self.state
            .lock()
            .await
            .hypothesis_replies
            .push_back(Ok(HypothesisResponse {
                success,
                explanation: explanation.into(),
                task_complete: Some(success),
            }));
    }

    pub async fn fail_next_hypothesis(&self, error: OracleError) {
        self.state.lock().await.hypothesis_replies.push_back(Err(error));
    }

    pub async fn fail_end(&self, error: OracleError) {
        self.state.lock().await.fail_end = Some(error);
    }

    /// Delay query replies, for exercising overlapping events.
    pub async fn set_query_delay(&self, delay: Duration) {
        self.state.lock().await.query_delay = Some(delay);
    }

    pub async fn set_hypothesis_delay(&self, delay: Duration) {
        self.state.lock().await.hypothesis_delay = Some(delay);
    }

    pub async fn calls(&self) -> MockCalls {
        self.state.lock().await.calls
    }

    /// Hypotheses received, in order.
    pub async fn hypotheses(&self) -> Vec<String> {
        self.state.lock().await.hypotheses.clone()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn start_task(&self, request: StartTaskRequest) -> Result<StartTaskResponse, OracleError> {
        let mut state = self.state.lock().await;
        state.calls.start += 1;
        if let Some(err) = state.fail_start.clone() {
            return Err(err);
        }
        state.queries_used = 0;
        let mut response = state.start_response.clone();
        if response.session_id.is_empty() {
            response.session_id = format!("{}-{}", request.task_id, Uuid::new_v4());
        }
        Ok(response)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, OracleError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.query += 1;
            state.query_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if let Some(err) = state.query_failures.pop_front() {
            return Err(err);
        }

        let results: Vec<QueryResult> = request
            .inputs
            .iter()
            .map(|input| QueryResult {
                input: input.clone(),
                output: (self.rule)(input),
            })
            .collect();

        let batch = u32::try_from(results.len()).unwrap_or(u32::MAX);
        state.queries_used = state.queries_used.saturating_add(batch);
        let reported = state
            .misreported_counts
            .pop_front()
            .unwrap_or(state.queries_used);
        let remaining = state.start_response.total_queries.saturating_sub(reported);

        Ok(QueryResponse {
            results,
            queries_used: reported,
            queries_remaining: Some(remaining),
        })
    }

    async fn submit_hypothesis(
        &self,
        request: HypothesisRequest,
    ) -> Result<HypothesisResponse, OracleError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.hypothesis += 1;
            state.hypothesis_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        state.hypotheses.push(request.hypothesis);
        state.hypothesis_replies.pop_front().unwrap_or_else(|| {
            Ok(HypothesisResponse {
                success: false,
                explanation: "That does not match the rule".to_string(),
                task_complete: Some(false),
            })
        })
    }

    async fn end_task(&self, _request: EndTaskRequest) -> Result<(), OracleError> {
        let mut state = self.state.lock().await;
        state.calls.end += 1;
        match state.fail_end.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
