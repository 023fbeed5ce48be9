use super::*;
use serde_json::json;

fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

fn plain(name: &str, text: &str) -> ElementDescription {
    ElementDescription::new(name, "plain", config(json!({"value": text, "heading": false})))
}

fn registry() -> ElementRegistry {
    let mut registry = ElementRegistry::new();
    registry.register("plain", "PlainText", field_mapping_extractor([("value", "content"), ("heading", "heading")]));
    registry.register("counter", "Counter", field_mapping_extractor([("count", "count")]));
    registry
}

// =============================================================
// register / lookup
// =============================================================

#[test]
fn register_returns_none_for_new_type() {
    let mut registry = ElementRegistry::new();
    assert!(registry.register("plain", "PlainText", field_mapping_extractor([("value", "value")])).is_none());
    assert!(registry.is_registered("plain"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn register_overwrites_and_returns_previous_entry() {
    let mut registry = registry();
    let previous = registry
        .register("plain", "FancyText", field_mapping_extractor([("value", "value")]))
        .expect("previous entry");
    assert_eq!(previous.renderer_id, "PlainText");
    assert_eq!(registry.lookup("plain").map(|e| e.renderer_id.as_str()), Some("FancyText"));
    assert_eq!(registry.len(), 2);
}

#[test]
fn lookup_unknown_type_is_none() {
    assert!(registry().lookup("missing").is_none());
}

#[test]
fn kinds_are_sorted() {
    assert_eq!(registry().kinds(), ["counter", "plain"]);
}

// =============================================================
// resolve
// =============================================================

#[test]
fn resolve_pairs_extractor_output_with_renderer_id() {
    let resolved = registry().resolve(Some(&plain("title", "Hello"))).expect("resolve");
    assert_eq!(resolved.renderer_id, "PlainText");
    assert_eq!(resolved.data, config(json!({"content": "Hello", "heading": false})));
}

#[test]
fn resolve_absent_description_is_unbound() {
    let err = registry().resolve(None).expect_err("absent");
    assert!(matches!(err, RegistryError::UnboundIdentifier(_)));
    assert_eq!(err.error_code(), "E_UNBOUND_IDENTIFIER");
}

#[test]
fn resolve_unknown_type_is_unregistered() {
    let description = ElementDescription::new("x", "hologram", Map::new());
    let err = registry().resolve(Some(&description)).expect_err("unknown type");
    assert!(matches!(err, RegistryError::UnregisteredType { ref kind } if kind == "hologram"));
    assert!(!err.retryable());
}

#[test]
fn resolve_uses_custom_extractor() {
    let mut registry = ElementRegistry::new();
    registry.register(
        "upper",
        "Upper",
        extractor(|description| {
            let mut data = Map::new();
            data.insert("name".to_owned(), json!(description.name.to_uppercase()));
            Ok(data)
        }),
    );
    let resolved = registry
        .resolve(Some(&ElementDescription::new("shout", "upper", Map::new())))
        .expect("resolve");
    assert_eq!(resolved.data.get("name"), Some(&json!("SHOUT")));
}

// =============================================================
// field mapping extractors
// =============================================================

#[test]
fn field_mapping_renames_present_field() {
    let extract = field_mapping_extractor([("srcA", "dstA")]);
    let description = ElementDescription::new("e", "t", config(json!({"srcA": 5})));
    assert_eq!(extract(&description).expect("extract"), config(json!({"dstA": 5})));
}

#[test]
fn field_mapping_missing_field_fails() {
    let extract = field_mapping_extractor([("srcA", "dstA")]);
    let description = ElementDescription::new("e", "t", Map::new());
    let err = extract(&description).expect_err("missing");
    assert!(matches!(err, RegistryError::MissingConfigField { ref field, .. } if field == "srcA"));
    assert_eq!(err.error_code(), "E_MISSING_CONFIG_FIELD");
}

#[test]
fn field_mapping_ignores_extra_fields() {
    let extract = field_mapping_extractor([("a", "b")]);
    let description = ElementDescription::new("e", "t", config(json!({"a": 1, "extra": 2})));
    assert_eq!(extract(&description).expect("extract"), config(json!({"b": 1})));
}

#[test]
fn field_mapping_without_configuration_is_unbound() {
    let extract = field_mapping_extractor([("a", "b")]);
    let description = ElementDescription { name: "e".to_owned(), kind: "t".to_owned(), configuration: None };
    let err = extract(&description).expect_err("no configuration");
    assert!(matches!(err, RegistryError::UnboundIdentifier(ref what) if what == "e.configuration"));
}

#[test]
fn field_mapping_optional_fields_copy_only_when_present() {
    let mapping = FieldMapping::new().required("a", "a").optional("address", "address");
    let without = ElementDescription::new("e", "t", config(json!({"a": 1})));
    let with = ElementDescription::new("e", "t", config(json!({"a": 1, "address": "select"})));
    assert_eq!(mapping.apply(&without).expect("extract"), config(json!({"a": 1})));
    assert_eq!(mapping.apply(&with).expect("extract"), config(json!({"a": 1, "address": "select"})));
}

// =============================================================
// ingest_response
// =============================================================

#[test]
fn ingest_writes_namespaced_keys_and_lists_elements_in_order() {
    let envelope = Envelope::success(vec![plain("b_second", "2"), plain("a_first", "1")]);
    let mut store = SharedStore::new();
    let mut elements = Vec::new();
    let writes = registry()
        .ingest_response(&envelope, &mut store, Some(&mut elements), false)
        .expect("ingest");
    assert_eq!(writes, 4);
    assert_eq!(store.get("b_second>>content"), Some(&json!("2")));
    assert_eq!(store.get("a_first>>content"), Some(&json!("1")));
    let names: Vec<&str> = elements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["b_second", "a_first"]);
    assert!(elements.iter().all(|e| e.renderer_id == "PlainText"));
}

#[test]
fn ingest_exception_makes_no_writes_and_no_appends() {
    let mut envelope = Envelope::exception("model crashed");
    envelope.element_descriptions.push(Some(plain("title", "ignored")));
    let mut store = SharedStore::new();
    let mut elements = Vec::new();
    let err = registry()
        .ingest_response(&envelope, &mut store, Some(&mut elements), false)
        .expect_err("exception");
    assert!(matches!(err, RegistryError::ApplicationException { ref reason } if reason == "model crashed"));
    assert!(store.is_empty());
    assert!(elements.is_empty());
}

#[test]
fn ingest_unregistered_type_leaves_store_untouched() {
    let envelope = Envelope::success(vec![
        plain("title", "Hello"),
        ElementDescription::new("x", "hologram", Map::new()),
    ]);
    let mut store = SharedStore::new();
    let err = registry().ingest_response(&envelope, &mut store, None, false).expect_err("unregistered");
    assert!(matches!(err, RegistryError::UnregisteredType { .. }));
    assert!(store.is_empty());
}

#[test]
fn ingest_malformed_description_is_unbound_and_writes_nothing() {
    let envelope =
        envelope::decode_envelope(br#"{"result": "success", "elementDescriptions": [
            {"name": "title", "type": "plain", "configuration": {"value": "Hello", "heading": false}},
            null
        ]}"#)
        .expect("decode");
    let mut store = SharedStore::new();
    let mut elements = Vec::new();
    let err = registry()
        .ingest_response(&envelope, &mut store, Some(&mut elements), false)
        .expect_err("null description");
    assert!(matches!(err, RegistryError::UnboundIdentifier(ref what) if what == "elementDescriptions[1]"));
    assert!(store.is_empty());
    assert!(elements.is_empty());
}

#[test]
fn ingest_description_without_configuration_is_unbound() {
    let envelope =
        envelope::decode_envelope(br#"{"result": "success", "elementDescriptions": [{"name": "title", "type": "plain"}]}"#)
            .expect("decode");
    let err = registry()
        .ingest_response(&envelope, &mut SharedStore::new(), None, false)
        .expect_err("no configuration");
    assert!(matches!(err, RegistryError::UnboundIdentifier(ref what) if what == "title.configuration"));
}

#[test]
fn ingest_strict_rejects_unknown_binding() {
    let envelope = Envelope::success(vec![plain("title", "Hello")]);
    let mut store = SharedStore::new();
    store.insert_namespaced("title", "content", json!("old"));
    let err = registry().ingest_response(&envelope, &mut store, None, true).expect_err("drift");
    assert!(matches!(err, RegistryError::UnknownBinding { ref key } if key == "title>>heading"));
    assert_eq!(store.get("title>>content"), Some(&json!("old")));
}

#[test]
fn ingest_strict_accepts_known_bindings() {
    let envelope = Envelope::success(vec![plain("title", "New")]);
    let mut store = SharedStore::new();
    store.insert_namespaced("title", "content", json!("old"));
    store.insert_namespaced("title", "heading", json!(true));
    registry().ingest_response(&envelope, &mut store, None, true).expect("ingest");
    assert_eq!(store.get("title>>content"), Some(&json!("New")));
    assert_eq!(store.get("title>>heading"), Some(&json!(false)));
}

#[test]
fn ingest_strict_is_ignored_when_listing_elements() {
    let envelope = Envelope::success(vec![plain("title", "Hello")]);
    let mut store = SharedStore::new();
    let mut elements = Vec::new();
    registry()
        .ingest_response(&envelope, &mut store, Some(&mut elements), true)
        .expect("new keys expected");
    assert_eq!(store.len(), 2);
}

#[test]
fn ingest_pending_envelope_still_decodes_descriptions() {
    let mut envelope = Envelope::pending("running");
    envelope.element_descriptions.push(Some(plain("title", "partial")));
    let mut store = SharedStore::new();
    registry().ingest_response(&envelope, &mut store, None, false).expect("ingest");
    assert_eq!(store.get("title>>content"), Some(&json!("partial")));
}
