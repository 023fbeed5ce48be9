//! CLI command implementations.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`App`] owns the registry, the store and the poll slots for one CLI run.
//! Poll sessions deliver finished envelopes over an mpsc channel, so every
//! store mutation happens on the command's own task.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use std::time::Duration;

use client::elements::{self, TABLES_FIELD};
use client::fetch_paths::{FetchPaths, fetch_component_index, join_url};
use client::latex::{self, LatexError};
use client::poll::{SessionSlots, SuccessCallback, TransportError, callback};
use client::sanitize::sanitize_url;
use client::{ElementRegistry, RegistryError, RenderedElement, SharedStore};
use envelope::{ComponentInfo, Envelope};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::Settings;

const PAGE_SLOT: &str = "page";
const POST_SLOT: &str = "post";
const TABLES_RENDERER: &str = "Tables";

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("table export failed: {0}")]
    Latex(#[from] LatexError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("timed out after {0}s waiting for the backend")]
    Timeout(u64),
    #[error("poll result channel closed")]
    ChannelClosed,
}

pub struct App {
    settings: Settings,
    http: reqwest::Client,
    slots: SessionSlots,
    registry: ElementRegistry,
    store: SharedStore,
    rendered: Vec<RenderedElement>,
    on_success: SuccessCallback,
    results: mpsc::UnboundedReceiver<Envelope>,
}

impl App {
    /// # Errors
    ///
    /// [`CliError::Transport`] if the HTTP client cannot be built.
    pub fn new(settings: Settings) -> Result<Self, CliError> {
        let http = settings.poll.http_client()?;
        let slots = SessionSlots::http(http.clone(), settings.policy()).with_terminal_exceptions();
        let mut registry = ElementRegistry::new();
        let registered = elements::register_builtin(&mut registry);
        let (on_success, results) = channel();
        tracing::debug!(registered, backend = %settings.backend_url, "app initialized");
        Ok(Self {
            settings,
            http,
            slots,
            registry,
            store: SharedStore::new(),
            rendered: Vec::new(),
            on_success,
            results,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub fn rendered(&self) -> &[RenderedElement] {
        &self.rendered
    }

    /// # Errors
    ///
    /// [`CliError::Transport`] if the index cannot be fetched or decoded.
    pub async fn components(&self) -> Result<Vec<ComponentInfo>, CliError> {
        let index = fetch_component_index(&self.http, &self.settings.backend_url).await?;
        Ok(index.component_infos)
    }

    /// Poll the component's default fetch path and ingest the result.
    /// Returns the number of store writes.
    ///
    /// # Errors
    ///
    /// Unknown component, transport failure on the index, timeout, or any
    /// ingest error.
    pub async fn load_component(&mut self, component: &str) -> Result<usize, CliError> {
        let index = fetch_component_index(&self.http, &self.settings.backend_url).await?;
        let paths = FetchPaths::from_index(self.settings.backend_url.clone(), &index);
        paths.fetch_default(&mut self.slots, PAGE_SLOT, component, self.on_success.clone())?;
        let envelope = self.wait().await?;
        self.ingest(&envelope, None)
    }

    /// POST `body` to an element endpoint and ingest the changed elements.
    ///
    /// # Errors
    ///
    /// Timeout, an [`RegistryError::ApplicationException`] from the backend,
    /// or any ingest error.
    pub async fn post(&mut self, path: &str, body: Value, strict: bool) -> Result<usize, CliError> {
        let url = join_url(&self.settings.backend_url, &sanitize_url(path));
        let outcome = self.slots.start_or_rebind(POST_SLOT, &url, self.on_success.clone(), body);
        tracing::debug!(?outcome, url = %url, "post issued");
        let envelope = self.wait().await?;
        self.ingest(&envelope, Some(strict))
    }

    /// Ingest one envelope. `strict: None` appends to the rendered list;
    /// `Some(strict)` updates existing elements in place.
    ///
    /// # Errors
    ///
    /// Any [`RegistryError`] from [`ElementRegistry::ingest_response`].
    pub fn ingest(&mut self, envelope: &Envelope, strict: Option<bool>) -> Result<usize, CliError> {
        let writes = match strict {
            None => self
                .registry
                .ingest_response(envelope, &mut self.store, Some(&mut self.rendered), false)?,
            Some(strict) => self.registry.ingest_response(envelope, &mut self.store, None, strict)?,
        };
        Ok(writes)
    }

    async fn wait(&mut self) -> Result<Envelope, CliError> {
        let secs = self.settings.wait_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.results.recv()).await {
            Ok(Some(envelope)) => Ok(envelope),
            Ok(None) => Err(CliError::ChannelClosed),
            Err(_) => Err(CliError::Timeout(secs)),
        }
    }

    /// Rendered elements in order, then every store entry.
    #[must_use]
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for element in self.rendered() {
            out.push_str(&format!("{}\t{}\n", element.renderer_id, element.name));
        }
        if !self.rendered.is_empty() && !self.store.is_empty() {
            out.push('\n');
        }
        for (key, value) in self.store().sorted_entries() {
            out.push_str(&format!("{key} = {value}\n"));
        }
        out
    }

    /// Every table held by a `Tables` element, as LaTeX.
    ///
    /// # Errors
    ///
    /// [`CliError::Latex`] when a stored table is malformed.
    pub fn latex_tables(&self) -> Result<String, CliError> {
        let mut out = String::new();
        for element in self.rendered.iter().filter(|e| e.renderer_id == TABLES_RENDERER) {
            let Some(value) = self.store.get_namespaced(&element.name, TABLES_FIELD) else {
                continue;
            };
            for table in latex::tables_from_value(value)? {
                let title = table.title.as_deref().unwrap_or(&element.name);
                out.push_str(&format!("% {title}\n"));
                out.push_str(&latex::to_latex(&table)?);
                out.push('\n');
            }
        }
        Ok(out)
    }
}

/// Tab-separated `name`, `title`, `default_fetch_path` lines.
#[must_use]
pub fn component_listing(components: &[ComponentInfo]) -> String {
    components
        .iter()
        .map(|info| format!("{}\t{}\t{}\n", info.name, info.title, info.default_fetch_path))
        .collect()
}

fn channel() -> (SuccessCallback, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let on_success = callback(move |envelope| {
        if tx.send(envelope).is_err() {
            tracing::debug!("poll result dropped: command no longer waiting");
        }
    });
    (on_success, rx)
}
