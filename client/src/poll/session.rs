//! Single-flight poll session.
//!
//! States: `Idle` ⇄ `Pending`. [`PollSession::new_request`] moves Idle to
//! Pending and spawns the attempt loop; a success envelope or
//! [`PollSession::clear`] moves it back. Every spawn bumps a generation
//! counter so a loop that outlived a `clear` cannot publish its answer.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use envelope::Envelope;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::policy::RetryPolicy;
use super::transport::Transport;
use crate::error::ErrorCode;

/// Invoked once per successful request, from the polling task.
pub type SuccessCallback = Arc<dyn Fn(Envelope) + Send + Sync>;

pub fn callback<F>(f: F) -> SuccessCallback
where
    F: Fn(Envelope) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Pending,
}

struct SessionInner {
    state: SessionState,
    body: Option<Value>,
    task: Option<JoinHandle<()>>,
    generation: u64,
    attempts: u64,
}

pub struct PollSession {
    inner: Arc<Mutex<SessionInner>>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    on_success: SuccessCallback,
    terminal_exceptions: bool,
}

impl std::fmt::Debug for PollSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSession")
            .field("url", &self.transport.url())
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PollSession {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy, on_success: SuccessCallback) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                body: None,
                task: None,
                generation: 0,
                attempts: 0,
            })),
            transport,
            policy,
            on_success,
            terminal_exceptions: false,
        }
    }

    /// Also stop on `result: "exception"` and hand that envelope to the
    /// callback. Off by default: only `success` ends polling.
    #[must_use]
    pub fn with_terminal_exceptions(mut self) -> Self {
        self.terminal_exceptions = true;
        self
    }

    /// Bind the payload sent with every attempt.
    #[must_use]
    pub fn with_body(self, body: Value) -> Self {
        lock(&self.inner).body = Some(body);
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == SessionState::Pending
    }

    /// Network attempts issued over the session's lifetime.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        lock(&self.inner).attempts
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.transport.url()
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Replace the bound payload. Refused while a request is in flight, so
    /// the attempts of one request always carry the same body.
    pub fn rebind_body(&self, body: Option<Value>) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state == SessionState::Pending {
            return false;
        }
        inner.body = body;
        true
    }

    /// Start polling. Returns `false`, and does nothing, when a request is
    /// already pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new_request(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state == SessionState::Pending {
            tracing::debug!(url = %self.transport.url(), "poll request ignored: already pending");
            return false;
        }

        inner.state = SessionState::Pending;
        inner.generation += 1;
        let attempt_loop = run_attempts(
            Arc::clone(&self.inner),
            Arc::clone(&self.transport),
            self.policy,
            Arc::clone(&self.on_success),
            inner.body.clone(),
            inner.generation,
            self.terminal_exceptions,
        );
        // Spawned under the lock so the loop cannot finish before its handle is stored.
        inner.task = Some(tokio::spawn(attempt_loop));
        tracing::debug!(url = %self.transport.url(), generation = inner.generation, "poll request started");
        true
    }

    /// Cancel any pending attempt or retry timer and return to `Idle`.
    /// Idempotent.
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        if let Some(task) = inner.task.take() {
            task.abort();
            tracing::debug!(url = %self.transport.url(), "poll request cleared");
        }
        inner.state = SessionState::Idle;
        inner.generation += 1;
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.clear();
    }
}

async fn run_attempts(
    inner: Arc<Mutex<SessionInner>>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    on_success: SuccessCallback,
    body: Option<Value>,
    generation: u64,
    terminal_exceptions: bool,
) {
    let mut failures: u32 = 0;
    loop {
        lock(&inner).attempts += 1;

        match transport.fetch(body.as_ref()).await {
            Ok(envelope) if envelope.is_success() || (terminal_exceptions && envelope.is_exception()) => {
                {
                    let mut guard = lock(&inner);
                    if guard.generation != generation {
                        return;
                    }
                    guard.state = SessionState::Idle;
                    guard.task = None;
                }
                tracing::debug!(url = %transport.url(), failures, result = envelope.result.as_str(), "poll request finished");
                on_success(envelope);
                return;
            }
            Ok(envelope) => {
                tracing::debug!(url = %transport.url(), result = envelope.result.as_str(), "poll result not final");
            }
            Err(error) => {
                tracing::warn!(url = %transport.url(), code = error.error_code(), %error, "poll attempt failed");
            }
        }

        failures = failures.saturating_add(1);
        tokio::time::sleep(policy.delay_after(failures)).await;
    }
}
