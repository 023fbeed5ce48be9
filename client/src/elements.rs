//! Element types the backend ships with.
//!
//! Each entry binds a backend type tag to the renderer that paints it and a
//! field mapping from the backend configuration to renderer fields.

#[cfg(test)]
#[path = "elements_test.rs"]
mod elements_test;

use crate::registry::{ElementRegistry, FieldMapping};

pub const PLAIN_TEXT: &str = "plain";
pub const CONNECTED_TABLES: &str = "connected_tables";
pub const BAR_CHART: &str = "softmax";
pub const SAMPLE_SELECTOR: &str = "sample_selector";
pub const TEXT_INPUT: &str = "text_input";
pub const COLLAPSIBLE: &str = "collapsible-subcomponent";

/// Renderer field under which `connected_tables` stores its tables.
pub const TABLES_FIELD: &str = "tables";

/// Register every built-in element type. Returns how many were registered.
pub fn register_builtin(registry: &mut ElementRegistry) -> usize {
    let builtin = [
        (
            PLAIN_TEXT,
            "PlainText",
            FieldMapping::new()
                .required("value", "value")
                .required("heading", "heading")
                .required("heading_level", "heading_level"),
        ),
        (
            CONNECTED_TABLES,
            "Tables",
            FieldMapping::new()
                .required("tables", TABLES_FIELD)
                .required("links", "links"),
        ),
        (
            BAR_CHART,
            "BarChartSelect",
            FieldMapping::new()
                .required("piece_infos", "piece_infos")
                .required("long_contexts", "long_contexts")
                .required("selectable", "selectable")
                .optional("address", "address"),
        ),
        (
            SAMPLE_SELECTOR,
            "Selector",
            FieldMapping::new()
                .required("address", "address")
                .required("button_text", "button_text")
                .required("subelement_configs", "subelement_configs"),
        ),
        (
            TEXT_INPUT,
            "TextInput",
            FieldMapping::new()
                .required("button_text", "button_text")
                .required("default_text", "default_text")
                .required("text_input", "text_input")
                .optional("address", "address"),
        ),
        (
            COLLAPSIBLE,
            "Collapsible",
            FieldMapping::new()
                .required("title", "title")
                .required("subelements", "subelements"),
        ),
    ];

    let count = builtin.len();
    for (kind, renderer_id, mapping) in builtin {
        registry.register(kind, renderer_id, mapping.into_extractor());
    }
    tracing::debug!(count, "registered built-in element types");
    count
}
