//! Task session controller.
//!
//! Drives one task attempt from start to completion. All session state sits
//! behind a single async mutex so events are serialized, while oracle calls
//! run with the lock released. Each event re-validates the session after its
//! call resolves: the first event to finish processing wins, and both the
//! query path and the timeout path rearm the round timer.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{OracleError, SessionError};
use crate::domain::models::{
    progress_user_key, HypothesisGate, QueryRecord, SessionStatus, TaskDescriptor, TaskSession,
    Verdict,
};
use crate::domain::ports::{
    EndTaskRequest, HypothesisRequest, Oracle, ProgressStore, QueryRequest, StartTaskRequest,
};
use crate::services::round_timer::RoundTimer;

/// Result of a successful query batch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub results: Vec<QueryRecord>,
    /// Queries charged to the ledger by this batch
    pub charged: u32,
    pub queries_used: u32,
    pub remaining: u32,
}

/// Result of processing a fired round deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// The round was lost; `charged` queries were consumed.
    Charged {
        charged: u32,
        queries_used: u32,
        remaining: u32,
    },
    /// The deadline moved before the timeout was processed.
    Stale,
    /// The session no longer accepts events.
    Inactive,
}

/// Result of a judged hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct HypothesisOutcome {
    pub verdict: Verdict,
    pub explanation: String,
    pub completed: bool,
    pub remaining: u32,
    /// Revealed once the task is completed
    pub rule_description: Option<String>,
    /// Set when completion could not be written to the progress store
    pub progress_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    Ended { status: SessionStatus },
    AlreadyEnded,
}

/// Point-in-time copy of the session for display.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: TaskSession,
    pub deadline: Option<Instant>,
    pub round_remaining: Option<Duration>,
    pub ended: bool,
}

struct SessionState {
    session: TaskSession,
    timer: RoundTimer,
    ended: bool,
    progress_recorded: bool,
}

/// Marks a call kind as outstanding until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, kind: &'static str) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::CallInFlight(kind))?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Budget held back from timeouts while a query batch is with the oracle.
struct Reservation<'a>(&'a AtomicU32);

impl<'a> Reservation<'a> {
    fn hold(reserved: &'a AtomicU32, size: u32) -> Self {
        reserved.store(size, Ordering::Release);
        Self(reserved)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Controller for one task attempt.
pub struct TaskSessionController {
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn ProgressStore>,
    user_key: String,
    session_id: String,
    task_id: String,
    state: Mutex<SessionState>,
    query_in_flight: AtomicBool,
    hypothesis_in_flight: AtomicBool,
    reserved_queries: AtomicU32,
}

impl TaskSessionController {
    /// Open a session with the oracle and start the first round.
    #[instrument(skip(oracle, store, descriptor), fields(task_id = %descriptor.id), err)]
    pub async fn start(
        oracle: Arc<dyn Oracle>,
        store: Arc<dyn ProgressStore>,
        user_name: &str,
        descriptor: &TaskDescriptor,
        round_duration: Duration,
    ) -> Result<Arc<Self>, SessionError> {
        let request = StartTaskRequest {
            user_name: user_name.trim().to_string(),
            task_id: descriptor.id.clone(),
            task_category: descriptor.category,
        };

        let response = oracle
            .start_task(request)
            .await
            .map_err(|source| SessionError::StartFailed {
                task_id: descriptor.id.clone(),
                source,
            })?;

        if response.query_batch_size == 0 {
            return Err(SessionError::StartFailed {
                task_id: descriptor.id.clone(),
                source: OracleError::InvalidResponse("query batch size of 0".to_string()),
            });
        }
        if descriptor.total_queries == 0 && response.total_queries == 0 {
            return Err(SessionError::StartFailed {
                task_id: descriptor.id.clone(),
                source: OracleError::InvalidResponse("query budget of 0".to_string()),
            });
        }

        if response.total_queries != descriptor.total_queries {
            warn!(
                catalog = descriptor.total_queries,
                oracle = response.total_queries,
                "catalog and oracle disagree on the query budget"
            );
        }
        if response.query_batch_size != descriptor.query_batch_size {
            warn!(
                catalog = descriptor.query_batch_size,
                oracle = response.query_batch_size,
                "catalog and oracle disagree on the batch size"
            );
        }

        let session = TaskSession::from_start(descriptor, response);
        let mut timer = RoundTimer::new(round_duration);
        timer.arm();

        info!(
            session_id = %session.session_id,
            total_queries = session.total_queries(),
            query_batch_size = session.query_batch_size(),
            "task session started"
        );

        Ok(Arc::new(Self {
            oracle,
            store,
            user_key: progress_user_key(user_name),
            session_id: session.session_id.clone(),
            task_id: session.task_id.clone(),
            state: Mutex::new(SessionState {
                session,
                timer,
                ended: false,
                progress_recorded: false,
            }),
            query_in_flight: AtomicBool::new(false),
            hypothesis_in_flight: AtomicBool::new(false),
            reserved_queries: AtomicU32::new(0),
        }))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Submit a batch of inputs. Blank entries are discarded first.
    #[instrument(skip(self, inputs), fields(task_id = %self.task_id), err)]
    pub async fn submit_query(&self, inputs: Vec<String>) -> Result<QueryOutcome, SessionError> {
        let inputs: Vec<String> = inputs
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();

        let _in_flight = InFlight::acquire(&self.query_in_flight, "query")?;
        let reservation = {
            let state = self.state.lock().await;
            state.session.check_query(inputs.len())?;
            let size = u32::try_from(inputs.len()).unwrap_or(u32::MAX);
            Reservation::hold(&self.reserved_queries, size)
        };

        let response = self
            .oracle
            .query(QueryRequest {
                session_id: self.session_id.clone(),
                inputs,
            })
            .await?;

        let results: Vec<QueryRecord> = response
            .results
            .into_iter()
            .map(|r| QueryRecord::new(r.input, r.output))
            .collect();

        let mut state = self.state.lock().await;
        let applied = state
            .session
            .apply_query_results(results.clone(), response.queries_used);
        // Released under the lock so no timeout sees a settled batch as pending
        drop(reservation);
        let charged = applied?;
        state.timer.rearm();

        debug!(
            charged,
            queries_used = state.session.queries_used(),
            "query batch recorded"
        );

        Ok(QueryOutcome {
            results,
            charged,
            queries_used: state.session.queries_used(),
            remaining: state.session.remaining(),
        })
    }

    /// Process the round deadline `fired` as a lost round.
    ///
    /// A deadline that no longer matches the timer is stale and ignored.
    #[instrument(skip(self), fields(task_id = %self.task_id))]
    pub async fn handle_timeout(&self, fired: Instant) -> Result<TimeoutOutcome, SessionError> {
        let mut state = self.state.lock().await;
        if state.ended || state.session.status().is_terminal() {
            return Ok(TimeoutOutcome::Inactive);
        }
        if state.timer.deadline() != Some(fired) {
            return Ok(TimeoutOutcome::Stale);
        }

        let reserved = self.reserved_queries.load(Ordering::Acquire);
        let charged = state.session.apply_timeout(reserved)?;
        state.timer.rearm();

        info!(
            charged,
            queries_used = state.session.queries_used(),
            "round timed out"
        );

        Ok(TimeoutOutcome::Charged {
            charged,
            queries_used: state.session.queries_used(),
            remaining: state.session.remaining(),
        })
    }

    /// Sleep until the current round deadline, returning it.
    ///
    /// Returns `None` when the timer is idle.
    pub async fn wait_for_deadline(&self) -> Option<Instant> {
        let deadline = self.state.lock().await.timer.deadline()?;
        tokio::time::sleep_until(deadline).await;
        Some(deadline)
    }

    /// Drive the round timer until the session stops accepting events,
    /// forwarding every charged timeout to `events`.
    pub async fn run_timer(self: Arc<Self>, events: mpsc::UnboundedSender<TimeoutOutcome>) {
        while let Some(deadline) = self.wait_for_deadline().await {
            match self.handle_timeout(deadline).await {
                Ok(TimeoutOutcome::Inactive) => break,
                Ok(TimeoutOutcome::Stale) => continue,
                Ok(outcome) => {
                    if events.send(outcome).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to process round timeout");
                    break;
                }
            }
        }
        debug!("round timer stopped");
    }

    /// Submit a natural-language hypothesis for judgment.
    #[instrument(skip(self, hypothesis), fields(task_id = %self.task_id), err)]
    pub async fn submit_hypothesis(
        &self,
        hypothesis: &str,
    ) -> Result<HypothesisOutcome, SessionError> {
        let _in_flight = InFlight::acquire(&self.hypothesis_in_flight, "hypothesis")?;
        let remaining_before = {
            let state = self.state.lock().await;
            state.session.check_hypothesis(hypothesis)?;
            state.session.remaining()
        };

        let response = self
            .oracle
            .submit_hypothesis(HypothesisRequest {
                session_id: self.session_id.clone(),
                hypothesis: hypothesis.to_string(),
            })
            .await?;

        let mut state = self.state.lock().await;
        state.session.ensure_in_progress()?;

        let verdict = HypothesisGate::classify(response.success, &response.explanation);
        let completed =
            state
                .session
                .apply_verdict(hypothesis.to_string(), verdict, remaining_before)?;

        info!(%verdict, completed, "hypothesis judged");

        let mut progress_error = None;
        if completed {
            state.timer.disarm();
            if let Err(e) = self.record_progress(&mut state).await {
                warn!(error = %e, "failed to record task progress");
                progress_error = Some(e.to_string());
            }
        }

        Ok(HypothesisOutcome {
            verdict,
            explanation: response.explanation,
            completed,
            remaining: state.session.remaining(),
            rule_description: state.session.rule_description().map(str::to_string),
            progress_error,
        })
    }

    async fn record_progress(&self, state: &mut SessionState) -> Result<(), SessionError> {
        let Some(record) = state.session.progress_record() else {
            return Ok(());
        };
        self.store.put(&self.user_key, &self.task_id, record).await?;
        state.progress_recorded = true;
        Ok(())
    }

    /// End the session. Safe to call more than once.
    ///
    /// The oracle is notified best-effort. An unfinished session is
    /// abandoned; a completed one whose progress write failed gets one retry.
    #[instrument(skip(self), fields(task_id = %self.task_id), err)]
    pub async fn end_task(&self) -> Result<EndOutcome, SessionError> {
        let status = {
            let mut state = self.state.lock().await;
            if state.ended {
                return Ok(EndOutcome::AlreadyEnded);
            }
            state.ended = true;
            state.session.abandon();
            state.timer.disarm();
            state.session.status()
        };

        if let Err(e) = self
            .oracle
            .end_task(EndTaskRequest {
                session_id: self.session_id.clone(),
            })
            .await
        {
            warn!(error = %e, "failed to notify oracle of session end");
        }

        let mut state = self.state.lock().await;
        if status == SessionStatus::Completed && !state.progress_recorded {
            info!("retrying progress write");
            self.record_progress(&mut state).await?;
        }

        info!(status = status.as_str(), "task session ended");
        Ok(EndOutcome::Ended { status })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            session: state.session.clone(),
            deadline: state.timer.deadline(),
            round_remaining: state.timer.remaining(),
            ended: state.ended,
        }
    }
}
