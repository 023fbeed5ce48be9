//! Backend response envelope and element descriptions.
//!
//! This crate owns the wire representation shared by the poller, the element
//! registry and the CLI. Element configuration stays flexible
//! (`serde_json::Map`) because its shape is decided per element type by the
//! extractor registered for that type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Error returned by the decode helpers.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The body was not valid JSON, or did not match the envelope schema.
    #[error("failed to decode envelope: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to encode envelope: {0}")]
    Encode(serde_json::Error),
}

/// Application-level result marker carried by every backend response.
///
/// Only [`Outcome::Success`] is terminal for a poller. Any value other than
/// `"success"` and `"exception"` means "not done yet" and is kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    /// The backend finished and the payload is complete.
    Success,
    /// The backend raised; `reason` carries the message for the user.
    Exception,
    /// Any other marker, e.g. `"running"` or `"queued"`.
    Pending(String),
}

impl Outcome {
    /// Wire string for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Exception => "exception",
            Self::Pending(raw) => raw,
        }
    }
}

impl From<String> for Outcome {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => Self::Success,
            "exception" => Self::Exception,
            _ => Self::Pending(raw),
        }
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => "success".to_owned(),
            Outcome::Exception => "exception".to_owned(),
            Outcome::Pending(raw) => raw,
        }
    }
}

/// Backend-supplied record naming a UI element's type and configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementDescription {
    /// Unique name of the element within its component.
    pub name: String,
    /// Registry key selecting the renderer and extractor.
    #[serde(rename = "type")]
    pub kind: String,
    /// Per-type configuration values. `None` when the backend omitted it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Map<String, Value>>,
}

impl ElementDescription {
    /// Build a description with a configuration object.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>, configuration: Map<String, Value>) -> Self {
        Self { name: name.into(), kind: kind.into(), configuration: Some(configuration) }
    }
}

/// Response body returned by component and element endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Application result marker.
    pub result: Outcome,
    /// Human-readable failure message, present with [`Outcome::Exception`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Element descriptions in render order. An entry that is not a
    /// well-formed description (`null`, missing `name` or `type`, a
    /// non-object `configuration`) decodes as `None` and is rejected at
    /// ingest time instead of failing the whole body.
    #[serde(default, rename = "elementDescriptions", deserialize_with = "tolerant_descriptions")]
    pub element_descriptions: Vec<Option<ElementDescription>>,
}

fn tolerant_descriptions<'de, D>(deserializer: D) -> Result<Vec<Option<ElementDescription>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match serde_json::from_value(entry) {
            Ok(description) => Some(description),
            Err(_) => None,
        })
        .collect())
}

impl Envelope {
    /// Terminal envelope carrying the given descriptions.
    #[must_use]
    pub fn success(element_descriptions: Vec<ElementDescription>) -> Self {
        Self {
            result: Outcome::Success,
            reason: None,
            element_descriptions: element_descriptions.into_iter().map(Some).collect(),
        }
    }

    /// Well-formed descriptions, skipping malformed entries.
    pub fn descriptions(&self) -> impl Iterator<Item = &ElementDescription> {
        self.element_descriptions.iter().flatten()
    }

    /// Envelope reporting a backend exception.
    #[must_use]
    pub fn exception(reason: impl Into<String>) -> Self {
        Self { result: Outcome::Exception, reason: Some(reason.into()), element_descriptions: Vec::new() }
    }

    /// Non-terminal envelope with an arbitrary marker.
    #[must_use]
    pub fn pending(marker: impl Into<String>) -> Self {
        Self { result: Outcome::Pending(marker.into()), reason: None, element_descriptions: Vec::new() }
    }

    /// Whether this envelope ends a poll.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == Outcome::Success
    }

    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.result == Outcome::Exception
    }
}

/// One tab/page the backend exposes, with the path its elements load from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub title: String,
    /// Path relative to the backend root, without a leading slash.
    pub default_fetch_path: String,
}

/// Response of the component index endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentIndex {
    pub result: Outcome,
    #[serde(default)]
    pub component_infos: Vec<ComponentInfo>,
}

/// Encode an envelope as JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(envelope).map_err(CodecError::Encode)
}

/// Decode an envelope from a response body.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON, a body missing the
/// `result` field, or a non-array `elementDescriptions`. Malformed entries
/// inside the array do not fail decoding.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode an envelope from an already parsed JSON value.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the value does not match the schema.
pub fn envelope_from_value(value: Value) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_value(value)?)
}

/// Decode the component index.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bodies.
pub fn decode_component_index(bytes: &[u8]) -> Result<ComponentIndex, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
