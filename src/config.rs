//! Runtime settings for the CLI.
//!
//! Flags come from clap (with `PANELBOARD_*` environment fallbacks). Poll
//! tunables the flags do not cover are read by [`PollConfig::from_env`].

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use client::poll::{PollConfig, RetryPolicy};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_WAIT_SECS: u64 = 120;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub poll: PollConfig,
    /// Use exponential back-off instead of the fixed interval.
    pub backoff: bool,
    /// How long a command waits for a poll to finish before giving up.
    pub wait_secs: u64,
}

impl Settings {
    /// Merge CLI flags over the environment-derived poll config.
    #[must_use]
    pub fn new(backend_url: String, interval_ms: Option<u64>, backoff: bool, wait_secs: u64) -> Self {
        Self::with_poll(backend_url, PollConfig::from_env(), interval_ms, backoff, wait_secs)
    }

    #[must_use]
    pub fn with_poll(
        backend_url: String,
        mut poll: PollConfig,
        interval_ms: Option<u64>,
        backoff: bool,
        wait_secs: u64,
    ) -> Self {
        if let Some(interval_ms) = interval_ms {
            poll.interval_ms = interval_ms;
        }
        Self {
            backend_url: backend_url.trim_end_matches('/').to_owned(),
            poll,
            backoff,
            wait_secs,
        }
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        if self.backoff {
            self.poll.exponential_policy()
        } else {
            self.poll.fixed_policy()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_poll(DEFAULT_BACKEND_URL.to_owned(), PollConfig::default(), None, false, DEFAULT_WAIT_SECS)
    }
}
