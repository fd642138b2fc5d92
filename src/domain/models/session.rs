/// Domain model for one task attempt.
///
/// A `TaskSession` owns the immutable task briefing received at start, the
/// query budget ledger, the hypothesis gate and the append-only histories.
/// All mutation goes through the `apply_*` transitions, which refuse to
/// touch a session that is no longer in progress.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::hypothesis::{HypothesisGate, Verdict};
use super::ledger::QueryLedger;
use super::progress::ProgressRecord;
use super::task::{TaskCategory, TaskDescriptor};
use crate::domain::errors::SessionError;
use crate::domain::ports::StartTaskResponse;

/// Ordered mapping of sample input to output.
pub type SampleCases = serde_json::Map<String, Value>;

/// Sentinel input recorded for each query lost to a round timeout.
pub const TIMEOUT_INPUT: &str = "[TIMEOUT]";

/// Output recorded alongside [`TIMEOUT_INPUT`].
pub const TIMEOUT_OUTPUT: &str = "Query timed out - no query made";

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting queries and hypotheses
    InProgress,
    /// Hypothesis accepted, or final attempt made on an exhausted budget
    Completed,
    /// Ended before completion; never recorded as progress
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// One evaluated input, or a synthetic timeout entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub input: String,
    pub output: Value,
}

impl QueryRecord {
    pub fn new(input: impl Into<String>, output: Value) -> Self {
        Self {
            input: input.into(),
            output,
        }
    }

    pub fn timeout() -> Self {
        Self::new(TIMEOUT_INPUT, Value::String(TIMEOUT_OUTPUT.to_string()))
    }

    pub fn is_timeout(&self) -> bool {
        self.input == TIMEOUT_INPUT
    }
}

/// A judged hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub hypothesis: String,
    pub verdict: Verdict,
}

/// Live state of one task attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSession {
    pub session_id: String,
    pub task_id: String,
    pub category: TaskCategory,
    pub input_spec: String,
    pub output_spec: String,
    pub sample_cases: SampleCases,
    pub test_cases_count: u32,

    #[serde(skip)]
    rule_description: String,

    ledger: QueryLedger,
    gate: HypothesisGate,
    query_history: Vec<QueryRecord>,
    submission_history: Vec<SubmissionRecord>,
    status: SessionStatus,
}

impl TaskSession {
    /// Build a session from the catalog descriptor and the oracle's start reply.
    ///
    /// The catalog's query budget wins over the oracle's; the oracle's batch
    /// size is authoritative.
    pub fn from_start(descriptor: &TaskDescriptor, start: StartTaskResponse) -> Self {
        let total_queries = if descriptor.total_queries > 0 {
            descriptor.total_queries
        } else {
            start.total_queries
        };

        Self {
            session_id: start.session_id,
            task_id: descriptor.id.clone(),
            category: descriptor.category,
            input_spec: start.input_spec,
            output_spec: start.output_spec,
            sample_cases: start.sample_cases,
            test_cases_count: start.test_cases_count,
            rule_description: start.rule_description,
            ledger: QueryLedger::new(total_queries, start.query_batch_size),
            gate: HypothesisGate::new(),
            query_history: Vec::new(),
            submission_history: Vec::new(),
            status: SessionStatus::InProgress,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn ledger(&self) -> &QueryLedger {
        &self.ledger
    }

    pub fn total_queries(&self) -> u32 {
        self.ledger.total_queries()
    }

    pub fn query_batch_size(&self) -> u32 {
        self.ledger.query_batch_size()
    }

    pub fn queries_used(&self) -> u32 {
        self.ledger.queries_used()
    }

    pub fn failed_queries(&self) -> u32 {
        self.ledger.failed_queries()
    }

    pub fn remaining(&self) -> u32 {
        self.ledger.remaining()
    }

    pub fn last_action_was_hypothesis(&self) -> bool {
        self.gate.last_action_was_hypothesis()
    }

    pub fn query_history(&self) -> &[QueryRecord] {
        &self.query_history
    }

    pub fn submission_history(&self) -> &[SubmissionRecord] {
        &self.submission_history
    }

    /// The hidden rule, revealed only once the task is completed.
    pub fn rule_description(&self) -> Option<&str> {
        (self.status == SessionStatus::Completed).then_some(self.rule_description.as_str())
    }

    /// Whether the task ended with an accepted hypothesis.
    pub fn succeeded(&self) -> bool {
        self.status == SessionStatus::Completed
            && self
                .submission_history
                .last()
                .is_some_and(|s| s.verdict.is_correct())
    }

    pub fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Completed => Err(SessionError::SessionCompleted),
            SessionStatus::Abandoned => Err(SessionError::SessionEnded),
        }
    }

    /// Validate a query batch against the budget without mutating anything.
    pub fn check_query(&self, batch_len: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let size = u32::try_from(batch_len).unwrap_or(u32::MAX);
        self.ledger.check_batch(size)
    }

    /// Validate a hypothesis against the gate without mutating anything.
    pub fn check_hypothesis(&self, text: &str) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.gate.check(text, self.ledger.remaining())
    }

    /// Apply a successful query batch: append results in order and adopt the
    /// oracle's cumulative count. Returns the number of queries charged.
    pub fn apply_query_results(
        &mut self,
        results: Vec<QueryRecord>,
        reported_queries_used: u32,
    ) -> Result<u32, SessionError> {
        self.ensure_in_progress()?;
        let charged = self.ledger.reconcile_confirmed(reported_queries_used)?;
        self.query_history.extend(results);
        self.gate.record_query();
        Ok(charged)
    }

    /// Charge a timed-out round as a failed batch of the session's batch
    /// size, capped by the budget not `reserved` for a pending query batch.
    /// Returns the number charged.
    pub fn apply_timeout(&mut self, reserved: u32) -> Result<u32, SessionError> {
        self.ensure_in_progress()?;
        let available = self.ledger.remaining().saturating_sub(reserved);
        let charge = self.ledger.query_batch_size().min(available);
        if charge == 0 {
            return Ok(0);
        }
        self.ledger.record_failed_batch(charge)?;
        self.query_history
            .extend(std::iter::repeat_with(QueryRecord::timeout).take(charge as usize));
        Ok(charge)
    }

    /// Record a judged hypothesis. `remaining_before` is the budget left when
    /// the hypothesis was submitted. Returns true when the task completed.
    pub fn apply_verdict(
        &mut self,
        hypothesis: String,
        verdict: Verdict,
        remaining_before: u32,
    ) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        self.submission_history
            .push(SubmissionRecord { hypothesis, verdict });
        self.gate.record_hypothesis();

        let completed = verdict.is_correct() || remaining_before == 0;
        if completed {
            self.status = SessionStatus::Completed;
        }
        Ok(completed)
    }

    /// Drop an unfinished attempt. Completed sessions stay completed.
    pub fn abandon(&mut self) {
        if self.status == SessionStatus::InProgress {
            self.status = SessionStatus::Abandoned;
        }
    }

    /// The record to persist, available once completed.
    pub fn progress_record(&self) -> Option<ProgressRecord> {
        (self.status == SessionStatus::Completed).then(|| {
            ProgressRecord::completed(
                self.task_id.clone(),
                self.queries_used(),
                self.total_queries(),
                self.succeeded(),
            )
        })
    }
}
