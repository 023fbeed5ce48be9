//! Poll-until-success client.
//!
//! DESIGN
//! ======
//! A [`PollSession`] asks one endpoint for an [`envelope::Envelope`] until the
//! backend answers `result: "success"`. The first attempt fires immediately;
//! every non-terminal answer or transport failure waits one [`RetryPolicy`]
//! delay and tries again. A session is single-flight: while an attempt or its
//! retry timer is outstanding, further requests are rejected, not queued.
//!
//! [`SessionSlots`] keys sessions by a caller-chosen slot name so a UI control
//! can coalesce rapid triggers into the request already in flight.
//!
//! ERROR HANDLING
//! ==============
//! Transport and decode failures are logged and retried on the session's
//! schedule. They never reach the caller. Only a non-JSON body or one
//! without `result` counts as a decode failure; a malformed description
//! entry inside a finished envelope is delivered and rejected at ingest. There is no attempt cap: a session
//! polls until success or [`PollSession::clear`].

pub mod policy;
pub mod session;
pub mod slots;
pub mod transport;



use std::time::Duration;

pub use policy::RetryPolicy;
pub use session::{PollSession, SessionState, SuccessCallback, callback};
pub use slots::{SessionSlots, SlotOutcome};
pub use transport::{HttpTransport, HttpTransportFactory, Method, Transport, TransportError, TransportFactory};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_POLL_BACKOFF_MAX_MS: u64 = 10_000;
pub const DEFAULT_POLL_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Polling tunables, loaded from environment variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between attempts, in milliseconds.
    pub interval_ms: u64,
    /// Upper bound for exponential back-off, in milliseconds.
    pub backoff_max_ms: u64,
    /// Whole-request timeout for one attempt, in seconds.
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            backoff_max_ms: DEFAULT_POLL_BACKOFF_MAX_MS,
            request_timeout_secs: DEFAULT_POLL_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_POLL_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl PollConfig {
    /// Read `POLL_INTERVAL_MS`, `POLL_BACKOFF_MAX_MS`,
    /// `POLL_REQUEST_TIMEOUT_SECS` and `POLL_CONNECT_TIMEOUT_SECS`.
    /// Missing or unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            interval_ms: env_parse("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            backoff_max_ms: env_parse("POLL_BACKOFF_MAX_MS", DEFAULT_POLL_BACKOFF_MAX_MS),
            request_timeout_secs: env_parse("POLL_REQUEST_TIMEOUT_SECS", DEFAULT_POLL_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: env_parse("POLL_CONNECT_TIMEOUT_SECS", DEFAULT_POLL_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Fixed-interval policy at `interval_ms`.
    #[must_use]
    pub fn fixed_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.interval_ms))
    }

    /// Doubling policy starting at `interval_ms`, capped at `backoff_max_ms`.
    #[must_use]
    pub fn exponential_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }

    /// Build the shared HTTP client with this config's timeouts.
    ///
    /// # Errors
    ///
    /// [`TransportError::ClientBuild`] if the TLS backend fails to initialize.
    pub fn http_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
