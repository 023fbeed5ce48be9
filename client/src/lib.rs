//! Client core for backend-driven panels.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend decides which elements a page shows. This crate turns its
//! responses into renderer input: `registry` resolves element descriptions,
//! `store` holds the extracted values under namespaced keys, `poll` keeps
//! asking the backend until a computation finishes, and `latex` exports
//! tables. Rendering itself lives outside this crate.

pub mod elements;
pub mod error;
pub mod fetch_paths;
pub mod latex;
pub mod poll;
pub mod registry;
pub mod sanitize;
pub mod store;

pub use error::ErrorCode;
pub use registry::{ElementRegistry, RegistryError, RenderedElement};
pub use store::SharedStore;
