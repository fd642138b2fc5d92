//! HTTP oracle client.
//!
//! Speaks the JSON-over-POST protocol of the evaluation backend. Non-2xx
//! answers carrying an `{ "error": ... }` body are reported as rejections;
//! connection failures and timeouts as unavailability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::errors::OracleError;
use crate::domain::models::OracleConfig;
use crate::domain::ports::{
    EndTaskRequest, HypothesisRequest, HypothesisResponse, Oracle, QueryRequest, QueryResponse,
    StartTaskRequest, StartTaskResponse,
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Oracle reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    http: Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OracleError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, OracleError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(format!("POST {path} failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| OracleError::Unavailable(format!("POST {path} body read failed: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| OracleError::InvalidResponse(format!("POST {path}: {e}")))
    }
}

fn classify_failure(status: StatusCode, body: &str) -> OracleError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => OracleError::Rejected(err.error),
        Err(_) if status.is_server_error() => {
            OracleError::Unavailable(format!("oracle returned {status}"))
        }
        Err(_) => OracleError::Rejected(format!("oracle returned {status}: {body}")),
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    #[instrument(skip(self), fields(task_id = %request.task_id), err)]
    async fn start_task(&self, request: StartTaskRequest) -> Result<StartTaskResponse, OracleError> {
        self.post("/api/start-task", &request).await
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id, batch = request.inputs.len()), err)]
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, OracleError> {
        self.post("/api/query", &request).await
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id), err)]
    async fn submit_hypothesis(
        &self,
        request: HypothesisRequest,
    ) -> Result<HypothesisResponse, OracleError> {
        self.post("/api/submit-hypothesis", &request).await
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id), err)]
    async fn end_task(&self, request: EndTaskRequest) -> Result<(), OracleError> {
        let _: serde_json::Value = self.post("/api/end-task", &request).await?;
        Ok(())
    }
}
