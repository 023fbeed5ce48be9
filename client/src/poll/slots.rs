//! Named poll sessions.
//!
//! A slot is a caller-chosen name for "the request this control issues".
//! Repeated triggers on one slot reuse its session: rebinding the body while
//! idle, coalescing into the in-flight request while pending.

#[cfg(test)]
#[path = "slots_test.rs"]
mod slots_test;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::policy::RetryPolicy;
use super::session::{PollSession, SuccessCallback};
use super::transport::{HttpTransportFactory, Method, TransportFactory};

/// What [`SessionSlots::start_or_rebind`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotOutcome {
    /// No session existed; one was created and its first request issued.
    Started,
    /// The idle session got the new body and a new request.
    Rebound,
    /// A request was already pending; nothing changed.
    Coalesced,
}

pub struct SessionSlots {
    factory: Arc<dyn TransportFactory>,
    policy: RetryPolicy,
    terminal_exceptions: bool,
    sessions: HashMap<String, PollSession>,
}

impl std::fmt::Debug for SessionSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlots")
            .field("policy", &self.policy)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl SessionSlots {
    #[must_use]
    pub fn new(factory: Arc<dyn TransportFactory>, policy: RetryPolicy) -> Self {
        Self { factory, policy, terminal_exceptions: false, sessions: HashMap::new() }
    }

    /// Slots backed by real HTTP transports sharing `http`.
    #[must_use]
    pub fn http(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self::new(Arc::new(HttpTransportFactory::new(http)), policy)
    }

    /// Sessions created from now on stop on backend exceptions too.
    /// See [`PollSession::with_terminal_exceptions`].
    #[must_use]
    pub fn with_terminal_exceptions(mut self) -> Self {
        self.terminal_exceptions = true;
        self
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&PollSession> {
        self.sessions.get(slot)
    }

    #[must_use]
    pub fn is_pending(&self, slot: &str) -> bool {
        self.sessions.get(slot).is_some_and(PollSession::is_pending)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session(&self, url: &str, method: Method, on_success: SuccessCallback) -> PollSession {
        let session = PollSession::new(self.factory.transport(url, method), self.policy, on_success);
        if self.terminal_exceptions {
            session.with_terminal_exceptions()
        } else {
            session
        }
    }

    /// POST `body` to `url` until success, reusing the slot's session.
    ///
    /// An existing idle session keeps its url and callback and only takes the
    /// new body.
    pub fn start_or_rebind(
        &mut self,
        slot: &str,
        url: &str,
        on_success: SuccessCallback,
        body: Value,
    ) -> SlotOutcome {
        if let Some(existing) = self.sessions.get(slot) {
            if existing.is_pending() {
                tracing::debug!(slot = %slot, "request coalesced into pending poll");
                return SlotOutcome::Coalesced;
            }
            existing.rebind_body(Some(body));
            existing.new_request();
            tracing::debug!(slot = %slot, url = %existing.url(), "poll session rebound");
            return SlotOutcome::Rebound;
        }

        let session = self.session(url, Method::Post, on_success).with_body(body);
        session.new_request();
        tracing::debug!(slot = %slot, url = %url, "poll session started");
        self.sessions.insert(slot.to_owned(), session);
        SlotOutcome::Started
    }

    /// Replace the slot's session with a fresh GET session on `url` and
    /// start it. Any previous session is cleared first.
    pub fn restart_get(&mut self, slot: &str, url: &str, on_success: SuccessCallback) {
        self.clear(slot);
        let session = self.session(url, Method::Get, on_success);
        session.new_request();
        tracing::debug!(slot = %slot, url = %url, "poll session restarted");
        self.sessions.insert(slot.to_owned(), session);
    }

    /// Cancel and forget the slot's session. Returns whether one existed.
    pub fn clear(&mut self, slot: &str) -> bool {
        match self.sessions.remove(slot) {
            Some(session) => {
                session.clear();
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        for (_, session) in self.sessions.drain() {
            session.clear();
        }
    }
}
