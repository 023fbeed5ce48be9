//! Keyed store shared by sibling elements of one page.
//!
//! SYSTEM CONTEXT
//! ==============
//! Elements never hold references to each other. A button element that
//! receives new data writes it here and every sibling reads its own keys.
//! Keys are always built by [`namespaced_key`] so two elements that both
//! carry e.g. a `value` field cannot overwrite each other.
//!
//! The store is owned by a single task; it has no interior locking.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Separator between the element name and the field name.
pub const KEY_SEPARATOR: &str = ">>";

/// Build the store key for `field` of element `element`.
#[must_use]
pub fn namespaced_key(element: &str, field: &str) -> String {
    format!("{element}{KEY_SEPARATOR}{field}")
}

/// Split a store key back into `(element, field)`.
///
/// Splits on the first separator, so a field name may itself contain `>>`.
#[must_use]
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(KEY_SEPARATOR)
}

/// Build namespaced pairs for a sub-element from its configuration.
///
/// `required` maps configuration field → store field. Fields missing from
/// the configuration are stored as `null`.
#[must_use]
pub fn assign_required_values(
    element: &str,
    configuration: &Map<String, Value>,
    required: &[(&str, &str)],
) -> Vec<(String, Value)> {
    required
        .iter()
        .map(|(source, target)| {
            let value = configuration.get(*source).cloned().unwrap_or(Value::Null);
            (namespaced_key(element, target), value)
        })
        .collect()
}

/// Process-scoped mapping from namespaced key to value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SharedStore {
    entries: HashMap<String, Value>,
}

impl SharedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `field` of `element`, returning the replaced value.
    pub fn insert_namespaced(&mut self, element: &str, field: &str, value: Value) -> Option<Value> {
        self.entries.insert(namespaced_key(element, field), value)
    }

    #[must_use]
    pub fn get_namespaced(&self, element: &str, field: &str) -> Option<&Value> {
        self.entries.get(&namespaced_key(element, field))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every key that belongs to `element`. Returns how many were removed.
    pub fn remove_element(&mut self, element: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| split_key(key).map_or(true, |(owner, _)| owner != element));
        before - self.entries.len()
    }

    /// Entries sorted by key, for deterministic output.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<(&str, &Value)> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Names of all elements with at least one key, sorted and deduplicated.
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .filter_map(|key| split_key(key).map(|(owner, _)| owner))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
