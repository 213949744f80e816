/// Session Controller - Run/Result State Machine
///
/// **Core Responsibility:**
/// Own the state of one compiler session and sequence at most one execution
/// at a time.
///
/// **State Machine:**
/// Idle -> Executing -> {Succeeded, Failed}; any non-executing state accepts a
/// new run, and reset returns to Idle from anywhere.
///
/// **Guarantees:**
/// - Single flight: a run trigger while a client call is outstanding is
///   rejected with `SessionError::ConcurrentExecution`, never queued
/// - Unauthenticated triggers are rejected before any state change or call
/// - Program errors settle as `Failed` with an `Ok` return; transport errors
///   settle as `Failed` and are also returned as `Err`
/// - `elapsed_ms == finished_at - started_at` exactly
///
/// **Cancellation:**
/// Reset while executing signals the in-flight run, which drops the pending
/// client call and returns `SessionError::Cancelled` without touching state.
/// The single-flight slot is held until that run has actually unwound.

use crate::auth::AuthProvider;
use crate::client::ExecutionClient;
use crate::error::SessionError;
use crate::metrics;
use byteforge_common::types::{ExecutionRequest, ExecutionResult, SessionSnapshot, SessionStatus};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct InFlight {
    run_id: Uuid,
    /// Taken by reset; `None` means the run has been told to stop
    cancel: Option<oneshot::Sender<()>>,
}

struct SessionState {
    status: SessionStatus,
    current_result: Option<ExecutionResult>,
    runs_started: u64,
    in_flight: Option<InFlight>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            current_result: None,
            runs_started: 0,
            in_flight: None,
        }
    }

    fn is_current(&self, run_id: Uuid) -> bool {
        matches!(&self.in_flight, Some(f) if f.run_id == run_id && f.cancel.is_some())
    }
}

/// Releases the single-flight slot when a run unwinds, however it unwinds
///
/// If the run future is dropped mid-call the session would otherwise stay
/// `Executing` forever, so an abandoned run also returns the session to Idle.
struct InFlightGuard<'a> {
    state: &'a Mutex<SessionState>,
    run_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(&state.in_flight, Some(f) if f.run_id == self.run_id) {
            if state.is_current(self.run_id) && state.status == SessionStatus::Executing {
                debug!(run_id = %self.run_id, "Run abandoned; session back to idle");
                state.status = SessionStatus::Idle;
                state.current_result = None;
            }
            state.in_flight = None;
        }
    }
}

pub struct SessionController {
    client: Arc<dyn ExecutionClient>,
    auth: Arc<dyn AuthProvider>,
    state: Mutex<SessionState>,
}

impl SessionController {
    pub fn new<C, A>(client: C, auth: A) -> Self
    where
        C: ExecutionClient + 'static,
        A: AuthProvider + 'static,
    {
        Self {
            client: Arc::new(client),
            auth: Arc::new(auth),
            state: Mutex::new(SessionState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Trigger a run of `request`
    ///
    /// Suspends only while the execution client call is pending.
    pub async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, SessionError> {
        if !self.auth.is_authenticated() {
            warn!("Run rejected: no authenticated user");
            metrics::record_rejection(metrics::REJECT_UNAUTHENTICATED);
            return Err(SessionError::Authorization);
        }

        let run_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        {
            let mut state = self.lock();
            if let Some(in_flight) = &state.in_flight {
                warn!(
                    run_id = %in_flight.run_id,
                    "Run rejected: execution already in flight"
                );
                metrics::record_rejection(metrics::REJECT_CONCURRENT);
                return Err(SessionError::ConcurrentExecution);
            }

            state.status = SessionStatus::Executing;
            state.current_result = None;
            state.runs_started += 1;
            state.in_flight = Some(InFlight {
                run_id,
                cancel: Some(cancel_tx),
            });
        }

        let _guard = InFlightGuard {
            state: &self.state,
            run_id,
        };

        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            run_id = %run_id,
            source_size = request.source_code().len(),
            input_size = request.stdin().len(),
            "Run dispatched"
        );

        let settled = tokio::select! {
            result = self.client.execute(&request) => Some(result),
            _ = cancel_rx => None,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;

        let Some(settled) = settled else {
            info!(run_id = %run_id, elapsed_ms, "Run cancelled by reset");
            metrics::record_outcome(metrics::OUTCOME_CANCELLED, elapsed_ms);
            return Err(SessionError::Cancelled);
        };

        match settled {
            Ok(outcome) => {
                let result =
                    ExecutionResult::program(outcome.output, outcome.error, started_at, elapsed_ms);
                self.settle(run_id, result.clone())?;

                let outcome_label = if result.is_success() {
                    metrics::OUTCOME_SUCCEEDED
                } else {
                    metrics::OUTCOME_PROGRAM_ERROR
                };
                metrics::record_outcome(outcome_label, elapsed_ms);
                info!(
                    run_id = %run_id,
                    status = %result.status(),
                    elapsed_ms,
                    output_size = result.output.len(),
                    "Run completed"
                );
                Ok(result)
            }
            Err(e) => {
                let error = SessionError::Transport(e);
                let result = ExecutionResult::transport(error.to_string(), started_at, elapsed_ms);
                self.settle(run_id, result)?;

                metrics::record_outcome(metrics::OUTCOME_TRANSPORT_ERROR, elapsed_ms);
                warn!(run_id = %run_id, elapsed_ms, error = %error, "Run failed in transport");
                Err(error)
            }
        }
    }

    /// Store the result of `run_id` unless a reset got there first
    fn settle(&self, run_id: Uuid, result: ExecutionResult) -> Result<(), SessionError> {
        let mut state = self.lock();
        if !state.is_current(run_id) {
            debug!(run_id = %run_id, "Discarding result of a reset run");
            metrics::record_outcome(metrics::OUTCOME_CANCELLED, result.elapsed_ms);
            return Err(SessionError::Cancelled);
        }

        state.status = result.status();
        state.current_result = Some(result);
        state.in_flight = None;
        Ok(())
    }

    /// Return to Idle and clear the result; signals cancellation to a pending run
    pub fn reset(&self) {
        let mut state = self.lock();
        if let Some(in_flight) = state.in_flight.as_mut() {
            if let Some(cancel) = in_flight.cancel.take() {
                info!(run_id = %in_flight.run_id, "Reset while executing; cancelling run");
                let _ = cancel.send(());
            }
        }
        state.status = SessionStatus::Idle;
        state.current_result = None;
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn current_result(&self) -> Option<ExecutionResult> {
        self.lock().current_result.clone()
    }

    /// True while a client call is outstanding, including a cancelled one
    /// that has not unwound yet
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            status: state.status,
            current_result: state.current_result.clone(),
            runs_started: state.runs_started,
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
