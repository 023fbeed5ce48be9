use axum::routing::{get, post};
use axum::{Json, Router};
use client::poll::PollConfig;
use envelope::ElementDescription;
use serde_json::json;

use super::*;

fn description(name: &str, kind: &str, configuration: Value) -> ElementDescription {
    ElementDescription::new(name, kind, configuration.as_object().cloned().expect("object"))
}

fn page() -> Envelope {
    Envelope::success(vec![
        description("title", "plain", json!({"value": "Hello", "heading": true, "heading_level": 1})),
        description(
            "results",
            "connected_tables",
            json!({
                "tables": [{"title": "Scores", "headers": ["Model", "Score"], "rows": [["a", "1"], ["b\nc", "2"]]}],
                "links": []
            }),
        ),
    ])
}

fn offline_app() -> App {
    App::new(Settings::default()).expect("app")
}

// =============================================================================
// INGEST AND OUTPUT
// =============================================================================

#[tokio::test]
async fn ingest_appends_rendered_elements_in_order() {
    let mut app = offline_app();
    let writes = app.ingest(&page(), None).expect("ingest");

    assert_eq!(writes, 5);
    let names: Vec<&str> = app.rendered().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["title", "results"]);
    assert_eq!(app.store().get("title>>value"), Some(&json!("Hello")));
}

#[tokio::test]
async fn ingest_exception_surfaces_reason_and_writes_nothing() {
    let mut app = offline_app();
    let err = app.ingest(&Envelope::exception("model crashed"), None).expect_err("exception");

    assert_eq!(err.to_string(), "model crashed");
    assert!(app.store().is_empty());
    assert!(app.rendered().is_empty());
}

#[tokio::test]
async fn strict_update_rejects_unknown_keys() {
    let mut app = offline_app();
    app.ingest(&page(), None).expect("ingest");

    let update = Envelope::success(vec![description(
        "other",
        "plain",
        json!({"value": "x", "heading": false, "heading_level": 0}),
    )]);
    let err = app.ingest(&update, Some(true)).expect_err("unknown element");
    assert!(matches!(err, CliError::Registry(RegistryError::UnknownBinding { .. })));

    let known = Envelope::success(vec![description(
        "title",
        "plain",
        json!({"value": "Bye", "heading": true, "heading_level": 1}),
    )]);
    app.ingest(&known, Some(true)).expect("known keys");
    assert_eq!(app.store().get("title>>value"), Some(&json!("Bye")));
    assert_eq!(app.rendered().len(), 2);
}

#[tokio::test]
async fn listing_prints_elements_then_sorted_store() {
    let mut app = offline_app();
    app.ingest(&Envelope::success(vec![description(
        "t",
        "plain",
        json!({"value": "v", "heading": false, "heading_level": 2}),
    )]), None)
    .expect("ingest");

    assert_eq!(
        app.listing(),
        "PlainText\tt\n\nt>>heading = false\nt>>heading_level = 2\nt>>value = \"v\"\n"
    );
}

#[tokio::test]
async fn latex_tables_exports_every_table_element() {
    let mut app = offline_app();
    app.ingest(&page(), None).expect("ingest");

    let latex = app.latex_tables().expect("latex");
    assert!(latex.starts_with("% Scores\n\\begin{center}\n"));
    assert!(latex.contains("Model & Score \\\\\n\\hline\n"));
    assert!(latex.contains("\\multirow{2}{*}"));
}

#[test]
fn component_listing_is_tab_separated() {
    let components = vec![ComponentInfo {
        name: "chat".into(),
        title: "Chat".into(),
        default_fetch_path: "chat/fetch".into(),
    }];
    assert_eq!(component_listing(&components), "chat\tChat\tchat/fetch\n");
}

// =============================================================================
// AGAINST A BACKEND
// =============================================================================

async fn spawn_backend() -> String {
    let app = Router::new()
        .route(
            "/fetch_component_infos",
            get(|| async {
                Json(json!({
                    "result": "success",
                    "component_infos": [
                        {"name": "chat", "title": "Chat", "default_fetch_path": "chat_fetch"},
                        {"name": "hollow", "title": "Hollow", "default_fetch_path": "hollow_fetch"}
                    ]
                }))
            }),
        )
        .route(
            "/chat_fetch",
            get(|| async {
                Json(json!({
                    "result": "success",
                    "elementDescriptions": [{
                        "name": "reply",
                        "type": "plain",
                        "configuration": {"value": "", "heading": false, "heading_level": 0}
                    }]
                }))
            }),
        )
        .route(
            "/chat_send",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "result": "success",
                    "elementDescriptions": [{
                        "name": "reply",
                        "type": "plain",
                        "configuration": {"value": body["text"], "heading": false, "heading_level": 0}
                    }]
                }))
            }),
        )
        .route(
            "/hollow_fetch",
            get(|| async { Json(json!({"result": "success", "elementDescriptions": [null]})) }),
        )
        .route(
            "/failing",
            post(|| async { Json(json!({"result": "exception", "reason": "handler raised"})) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn app_for(base: String) -> App {
    let poll = PollConfig { interval_ms: 20, ..PollConfig::default() };
    App::new(Settings::with_poll(base, poll, None, false, 5)).expect("app")
}

#[tokio::test]
async fn components_lists_backend_index() {
    let app = app_for(spawn_backend().await);
    let components = app.components().await.expect("components");
    assert_eq!(components[0].default_fetch_path, "chat_fetch");
}

#[tokio::test]
async fn load_then_post_updates_existing_element() {
    let mut app = app_for(spawn_backend().await);
    app.load_component("chat").await.expect("load");
    assert_eq!(app.store().get("reply>>value"), Some(&json!("")));

    app.post("/Chat_Send", json!({"text": "hi there"}), true).await.expect("post");
    assert_eq!(app.store().get("reply>>value"), Some(&json!("hi there")));
    assert_eq!(app.rendered().len(), 1);
}

#[tokio::test]
async fn load_unknown_component_is_unbound() {
    let mut app = app_for(spawn_backend().await);
    let err = app.load_component("missing").await.expect_err("unknown");
    assert!(matches!(err, CliError::Registry(RegistryError::UnboundIdentifier(_))));
}

#[tokio::test]
async fn null_description_fails_load_instead_of_waiting() {
    let mut app = app_for(spawn_backend().await);
    let err = app.load_component("hollow").await.expect_err("malformed page");
    assert!(matches!(err, CliError::Registry(RegistryError::UnboundIdentifier(_))));
    assert!(app.store().is_empty());
}

#[tokio::test]
async fn backend_exception_on_post_is_surfaced() {
    let mut app = app_for(spawn_backend().await);
    let err = app.post("failing", json!({}), false).await.expect_err("exception");
    assert!(matches!(err, CliError::Registry(RegistryError::ApplicationException { ref reason }) if reason == "handler raised"));
}
