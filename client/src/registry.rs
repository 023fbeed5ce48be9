//! Element registry: backend type tag → renderer id + extractor.
//!
//! DESIGN
//! ======
//! The backend names an element type as a string. Each type is registered
//! once at start-up with the id of the renderer that paints it and an
//! extractor that turns the description's configuration into the key/value
//! pairs that renderer reads from the [`SharedStore`].
//!
//! Re-registering a type replaces the previous entry (last registration
//! wins) and hands the replaced entry back to the caller.
//!
//! ERROR HANDLING
//! ==============
//! [`ElementRegistry::lookup`] is the non-failing probe. Everything on the
//! ingest path returns [`RegistryError`]; these are configuration or
//! deployment defects and are never retried. Ingestion stages every element
//! before writing, so a failure anywhere leaves the store untouched.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use envelope::{ElementDescription, Envelope, Outcome};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::store::{SharedStore, namespaced_key};

/// Renderer-ready key/value data produced by an extractor.
pub type ExtractedData = Map<String, Value>;

/// Turns one element description into renderer input.
pub type Extractor = Arc<dyn Fn(&ElementDescription) -> Result<ExtractedData, RegistryError> + Send + Sync>;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An element description, or a field it must carry, is absent.
    #[error("unbound identifier: {0}")]
    UnboundIdentifier(String),
    /// The backend sent a type tag nothing is registered for.
    #[error("element type \"{kind}\" is not registered")]
    UnregisteredType { kind: String },
    /// The extractor's required configuration field is absent.
    #[error("invalid configuration for \"{element}\": '{field}' not in configuration")]
    MissingConfigField { element: String, field: String },
    /// Strict ingest tried to write a key the store did not already hold.
    #[error("unknown binding \"{key}\" (producer and consumer schemas differ)")]
    UnknownBinding { key: String },
    /// The backend reported `result: "exception"`.
    #[error("{reason}")]
    ApplicationException { reason: String },
}

impl ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnboundIdentifier(_) => "E_UNBOUND_IDENTIFIER",
            Self::UnregisteredType { .. } => "E_UNREGISTERED_TYPE",
            Self::MissingConfigField { .. } => "E_MISSING_CONFIG_FIELD",
            Self::UnknownBinding { .. } => "E_UNKNOWN_BINDING",
            Self::ApplicationException { .. } => "E_APPLICATION_EXCEPTION",
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Renderer id and extractor bound to one element type.
#[derive(Clone)]
pub struct RegisteredElementType {
    pub renderer_id: String,
    pub extract: Extractor,
}

impl fmt::Debug for RegisteredElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredElementType")
            .field("renderer_id", &self.renderer_id)
            .finish_non_exhaustive()
    }
}

/// Result of resolving one description.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub renderer_id: String,
    pub data: ExtractedData,
}

/// An element the rendering layer should instantiate, in description order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedElement {
    pub renderer_id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct ElementRegistry {
    types: HashMap<String, RegisteredElementType>,
}

impl ElementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `kind` to a renderer and extractor, returning any replaced entry.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        renderer_id: impl Into<String>,
        extract: Extractor,
    ) -> Option<RegisteredElementType> {
        let kind = kind.into();
        let entry = RegisteredElementType { renderer_id: renderer_id.into(), extract };
        let previous = self.types.insert(kind.clone(), entry);
        if let Some(previous) = &previous {
            debug!(%kind, replaced = %previous.renderer_id, "element type re-registered");
        }
        previous
    }

    #[must_use]
    pub fn lookup(&self, kind: &str) -> Option<&RegisteredElementType> {
        self.types.get(kind)
    }

    #[must_use]
    pub fn is_registered(&self, kind: &str) -> bool {
        self.types.contains_key(kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered type tags, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.types.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Resolve one description into its renderer id and extracted data.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnboundIdentifier`] when `description` is `None`,
    /// [`RegistryError::UnregisteredType`] for unknown types, and whatever
    /// the extractor returns.
    pub fn resolve(&self, description: Option<&ElementDescription>) -> Result<Resolved, RegistryError> {
        let Some(description) = description else {
            return Err(RegistryError::UnboundIdentifier("element description".to_owned()));
        };
        let Some(entry) = self.types.get(&description.kind) else {
            return Err(RegistryError::UnregisteredType { kind: description.kind.clone() });
        };
        let data = (entry.extract)(description)?;
        Ok(Resolved { renderer_id: entry.renderer_id.clone(), data })
    }

    /// Decode every description of `envelope` into `store`.
    ///
    /// When `out_elements` is given, one [`RenderedElement`] per description
    /// is appended in description order. `strict` rejects writes to keys the
    /// store does not hold yet; it only applies when `out_elements` is `None`,
    /// since listing elements for rendering means new keys are expected.
    ///
    /// Returns the number of store writes.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ApplicationException`] for `result: "exception"`,
    /// [`RegistryError::UnboundIdentifier`] for a malformed description
    /// entry, otherwise any resolution or strict-binding error. On error nothing
    /// was written and nothing was appended.
    pub fn ingest_response(
        &self,
        envelope: &Envelope,
        store: &mut SharedStore,
        out_elements: Option<&mut Vec<RenderedElement>>,
        strict: bool,
    ) -> Result<usize, RegistryError> {
        if envelope.result == Outcome::Exception {
            let reason = envelope
                .reason
                .clone()
                .unwrap_or_else(|| "backend raised an exception without a reason".to_owned());
            warn!(%reason, "backend reported exception");
            return Err(RegistryError::ApplicationException { reason });
        }

        let mut staged = Vec::with_capacity(envelope.element_descriptions.len());
        for (index, entry) in envelope.element_descriptions.iter().enumerate() {
            let Some(description) = entry else {
                return Err(RegistryError::UnboundIdentifier(format!("elementDescriptions[{index}]")));
            };
            staged.push((description, self.resolve(Some(description))?));
        }

        if strict && out_elements.is_none() {
            for (description, resolved) in &staged {
                for field in resolved.data.keys() {
                    let key = namespaced_key(&description.name, field);
                    if !store.contains(&key) {
                        return Err(RegistryError::UnknownBinding { key });
                    }
                }
            }
        }

        if let Some(out) = out_elements {
            out.extend(staged.iter().map(|(description, resolved)| RenderedElement {
                renderer_id: resolved.renderer_id.clone(),
                name: description.name.clone(),
            }));
        }

        let elements = staged.len();
        let mut writes = 0_usize;
        for (description, resolved) in staged {
            for (field, value) in resolved.data {
                store.insert_namespaced(&description.name, &field, value);
                writes += 1;
            }
        }
        debug!(elements, writes, "ingested backend response");
        Ok(writes)
    }
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Wrap a closure as an [`Extractor`].
pub fn extractor<F>(f: F) -> Extractor
where
    F: Fn(&ElementDescription) -> Result<ExtractedData, RegistryError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Borrow the configuration of `description`, failing when it is absent.
///
/// # Errors
///
/// [`RegistryError::UnboundIdentifier`] naming `<element>.configuration`.
pub fn configuration_required(description: &ElementDescription) -> Result<&Map<String, Value>, RegistryError> {
    description
        .configuration
        .as_ref()
        .ok_or_else(|| RegistryError::UnboundIdentifier(format!("{}.configuration", description.name)))
}

/// Rename map from backend configuration fields to renderer fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMapping {
    required: Vec<(String, String)>,
    optional: Vec<(String, String)>,
}

impl FieldMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Field that must be present; copied from `source` to `target`.
    #[must_use]
    pub fn required(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.required.push((source.into(), target.into()));
        self
    }

    /// Field copied only when present.
    #[must_use]
    pub fn optional(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.optional.push((source.into(), target.into()));
        self
    }

    /// Produce the renamed copy for one description.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnboundIdentifier`] without configuration and
    /// [`RegistryError::MissingConfigField`] for the first absent required
    /// field.
    pub fn apply(&self, description: &ElementDescription) -> Result<ExtractedData, RegistryError> {
        let configuration = configuration_required(description)?;
        let mut data = Map::new();
        for (source, target) in &self.required {
            let Some(value) = configuration.get(source) else {
                return Err(RegistryError::MissingConfigField {
                    element: description.name.clone(),
                    field: source.clone(),
                });
            };
            data.insert(target.clone(), value.clone());
        }
        for (source, target) in &self.optional {
            if let Some(value) = configuration.get(source) {
                data.insert(target.clone(), value.clone());
            }
        }
        Ok(data)
    }

    #[must_use]
    pub fn into_extractor(self) -> Extractor {
        Arc::new(move |description: &ElementDescription| self.apply(description))
    }
}

/// Extractor that requires and renames every field in `field_map`.
pub fn field_mapping_extractor<I, K, V>(field_map: I) -> Extractor
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    field_map
        .into_iter()
        .fold(FieldMapping::new(), |mapping, (source, target)| mapping.required(source, target))
        .into_extractor()
}
