//! HTTP transport for poll sessions.
//!
//! A transport performs one request and decodes the body as an
//! [`Envelope`]. HTTP status is not inspected: the backend reports failure
//! through `result`, so any decodable body counts as an answer.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::sync::Arc;

use envelope::{CodecError, Envelope};
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::error::ErrorCode;

const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("response decode failed: {0}")]
    Decode(#[from] CodecError),
    #[error("http client build failed: {0}")]
    ClientBuild(String),
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_TRANSPORT_REQUEST",
            Self::Decode(_) => "E_TRANSPORT_DECODE",
            Self::ClientBuild(_) => "E_TRANSPORT_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Decode(_))
    }
}

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// One request/response exchange with the backend. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Perform one attempt. `body` is only sent by transports that carry one.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails or the body is not
    /// an envelope.
    async fn fetch(&self, body: Option<&Value>) -> Result<Envelope, TransportError>;

    /// Endpoint this transport talks to, for logging.
    fn url(&self) -> &str;
}

/// Builds transports for [`super::SessionSlots`].
pub trait TransportFactory: Send + Sync {
    fn transport(&self, url: &str, method: Method) -> Arc<dyn Transport>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

// =============================================================================
// HTTP
// =============================================================================

#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    method: Method,
}

impl HttpTransport {
    #[must_use]
    pub fn new(http: reqwest::Client, url: impl Into<String>, method: Method) -> Self {
        Self { http, url: url.into(), method }
    }

    #[must_use]
    pub fn get(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self::new(http, url, Method::Get)
    }

    #[must_use]
    pub fn post(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self::new(http, url, Method::Post)
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, body: Option<&Value>) -> Result<Envelope, TransportError> {
        let request = match self.method {
            Method::Get => self.http.get(&self.url).header(ACCEPT, JSON_MEDIA_TYPE),
            // Absent bodies go out as JSON `null`; reqwest sets Content-Type.
            Method::Post => self
                .http
                .post(&self.url)
                .header(ACCEPT, JSON_MEDIA_TYPE)
                .json(body.unwrap_or(&Value::Null)),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        tracing::debug!(url = %self.url, status, len = bytes.len(), "poll response received");

        Ok(envelope::decode_envelope(&bytes)?)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// [`TransportFactory`] sharing one [`reqwest::Client`] across sessions.
#[derive(Clone, Debug)]
pub struct HttpTransportFactory {
    http: reqwest::Client,
}

impl HttpTransportFactory {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn transport(&self, url: &str, method: Method) -> Arc<dyn Transport> {
        Arc::new(HttpTransport::new(self.http.clone(), url, method))
    }
}
