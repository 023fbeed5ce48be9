//! Where each component loads its elements from.
//!
//! The backend publishes a component index (`GET /fetch_component_infos`)
//! naming every component and its default fetch path. [`FetchPaths`] keeps
//! that mapping and starts the initial GET poll for a component.

#[cfg(test)]
#[path = "fetch_paths_test.rs"]
mod fetch_paths_test;

use std::collections::HashMap;

use envelope::ComponentIndex;
use reqwest::header::ACCEPT;

use crate::poll::{SessionSlots, SuccessCallback, TransportError};
use crate::registry::RegistryError;

pub const COMPONENT_INDEX_PATH: &str = "fetch_component_infos";

/// Join a backend base address and a path with exactly one `/`.
#[must_use]
pub fn join_url(backend: &str, path: &str) -> String {
    format!("{}/{}", backend.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Fetch and decode the backend's component index.
///
/// # Errors
///
/// [`TransportError`] on network failure or an undecodable body.
pub async fn fetch_component_index(http: &reqwest::Client, backend: &str) -> Result<ComponentIndex, TransportError> {
    let url = join_url(backend, COMPONENT_INDEX_PATH);
    let response = http.get(&url).header(ACCEPT, "application/json").send().await?;
    let bytes = response.bytes().await?;
    let index = envelope::decode_component_index(&bytes)?;
    tracing::debug!(url = %url, components = index.component_infos.len(), "component index fetched");
    Ok(index)
}

#[derive(Clone, Debug, Default)]
pub struct FetchPaths {
    backend: String,
    paths: HashMap<String, String>,
}

impl FetchPaths {
    #[must_use]
    pub fn new(backend: impl Into<String>) -> Self {
        Self { backend: backend.into(), paths: HashMap::new() }
    }

    #[must_use]
    pub fn from_index(backend: impl Into<String>, index: &ComponentIndex) -> Self {
        let mut paths = Self::new(backend);
        for info in &index.component_infos {
            paths.insert(&info.name, &info.default_fetch_path);
        }
        paths
    }

    /// Returns the path previously registered for `component`, if any.
    pub fn insert(&mut self, component: &str, path: &str) -> Option<String> {
        self.paths.insert(component.to_owned(), path.to_owned())
    }

    #[must_use]
    pub fn path(&self, component: &str) -> Option<&str> {
        self.paths.get(component).map(String::as_str)
    }

    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Absolute URL of the component's default fetch path.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnboundIdentifier`] when the component is unknown.
    pub fn url_for(&self, component: &str) -> Result<String, RegistryError> {
        let path = self
            .path(component)
            .ok_or_else(|| RegistryError::UnboundIdentifier(format!("default fetch path of {component}")))?;
        Ok(join_url(&self.backend, path))
    }

    /// Start the initial GET poll for `component` in `slot`, replacing any
    /// session the slot held.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnboundIdentifier`] when the component is unknown;
    /// the slot is left untouched in that case.
    pub fn fetch_default(
        &self,
        slots: &mut SessionSlots,
        slot: &str,
        component: &str,
        on_success: SuccessCallback,
    ) -> Result<(), RegistryError> {
        let url = self.url_for(component)?;
        tracing::info!(component = %component, url = %url, "fetching component elements");
        slots.restart_get(slot, &url, on_success);
        Ok(())
    }
}
