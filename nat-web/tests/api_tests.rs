//! Integration tests for nat-web API endpoints
//!
//! Tests cover:
//! - Health, UI, build info and taxonomy endpoints
//! - Session creation and the annotation commands
//! - Survey gating and error mapping (422 / 404 / 409)
//! - A full three-article run reaching the completion code and the sink
//! - A failing sink never changing what the worker sees
//! - Diagnostic export in development and production modes
//! - Session release after a production finish

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use nat_common::articles::{ArticleCatalog, SelectionStrategy};
use nat_common::payload::{is_completion_code, SessionPayload};
use nat_common::session::SessionSettings;
use nat_common::sink::{SubmissionReceipt, SubmissionSink};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::util::ServiceExt; // for `oneshot` method
use nat_web::{build_router, AppState};

const SPAN: &str = "a reckless and corrupt regime";
const RATIONALE: &str = "The article labels its opponents with loaded words and exaggerates the danger without citing any evidence.";

/// Test sink: forwards every payload to a channel
struct RecordingSink {
    tx: mpsc::UnboundedSender<SessionPayload>,
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn submit(&self, payload: &SessionPayload) -> nat_common::Result<SubmissionReceipt> {
        let _ = self.tx.send(payload.clone());
        Ok(SubmissionReceipt {
            sink: self.name(),
            location: payload.session_id.to_string(),
        })
    }
}

/// Test sink: rejects every payload
struct FailingSink;

#[async_trait]
impl SubmissionSink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn submit(&self, _payload: &SessionPayload) -> nat_common::Result<SubmissionReceipt> {
        Err(nat_common::Error::Sink("storage offline".to_string()))
    }
}

fn catalog() -> ArticleCatalog {
    let mut csv = String::from("Headline,News body\n");
    for i in 0..5 {
        csv.push_str(&format!(
            "senate passes the bill {i},\"Lawmakers voted late on Friday. Opponents called it a reckless and corrupt regime of spending.\"\n"
        ));
    }
    ArticleCatalog::from_reader(csv.as_bytes()).unwrap()
}

/// Test helper: Create app with the given sink
fn setup_app_with_sink(sink: Arc<dyn SubmissionSink>, production: bool) -> Router {
    let state = AppState::new(
        catalog(),
        SelectionStrategy::Fixed {
            indices: vec![3, 0, 1],
        },
        SessionSettings::default(),
        sink,
        Some(7),
        production,
    );
    build_router(state)
}

/// Test helper: Create app with a recording sink
fn setup_app(production: bool) -> (Router, mpsc::UnboundedReceiver<SessionPayload>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (setup_app_with_sink(Arc::new(RecordingSink { tx }), production), rx)
}

/// Test helper: Create request with optional JSON body
fn test_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: Send request and decode the JSON response
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_request(method, uri, body))
        .await
        .unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/api/sessions", Some(json!({ "workerId": "W123" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

async fn annotate_and_survey(app: &Router, id: &str) -> Value {
    let base = format!("/api/sessions/{}", id);

    let (status, _) = send(app, "POST", &format!("{base}/selection"), Some(json!({ "text": SPAN }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        "POST",
        &format!("{base}/category"),
        Some(json!({ "category": "Inflammatory_Language" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "pending");

    let (status, body) = send(
        app,
        "POST",
        &format!("{base}/subcategory"),
        Some(json!({ "subcategory": "Demonization" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "saved");

    let (_, body) = send(app, "POST", &format!("{base}/advance"), None).await;
    assert_eq!(body["outcome"], "survey_opened");

    let (status, _) = send(
        app,
        "POST",
        &format!("{base}/survey"),
        Some(json!({ "confidence": 4, "bias": 2, "rationale": RATIONALE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, "POST", &format!("{base}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    body
}

// =============================================================================
// Static endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _rx) = setup_app(false);
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "nat-web");
    assert_eq!(body["articles"], 5);
    assert_eq!(body["active_sessions"], 0);
    assert_eq!(body["finished_sessions"], 0);
    assert_eq!(body["evicted_sessions"], 0);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_index_and_script_served() {
    let (app, _rx) = setup_app(false);

    let response = app.clone().oneshot(test_request("GET", "/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(test_request("GET", "/static/app.js", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/javascript"
    );
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let (app, _rx) = setup_app(false);
    let (status, body) = send(&app, "GET", "/api/buildinfo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
    assert_eq!(body["study"]["taxonomy"], "v2");
    assert_eq!(body["study"]["selection"]["min_words"], 4);
    assert_eq!(body["study"]["rationale_rule"]["kind"], "min_characters");
    assert_eq!(body["study"]["sink"], "recording");
    assert_eq!(body["study"]["production"], false);
}

#[tokio::test]
async fn test_taxonomy_endpoint() {
    let (app, _rx) = setup_app(false);
    let (status, body) = send(&app, "GET", "/api/taxonomy", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "v2");
    assert_eq!(body["categories"][1]["category"], "Inflammatory_Language");
    assert_eq!(body["categories"][1]["subcategories"][3], "Scapegoating");
}

// =============================================================================
// Session commands
// =============================================================================

#[tokio::test]
async fn test_create_session_returns_first_article() {
    let (app, _rx) = setup_app(false);
    let (status, body) = send(&app, "POST", "/api/sessions", None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"]["state"], "annotating");
    assert_eq!(body["state"]["article_index"], 0);
    assert_eq!(body["article_count"], 3);
    assert_eq!(body["article"]["id"], 4);
    assert_eq!(body["article"]["title"], "Senate Passes the Bill 3");
    assert_eq!(body["selection"]["min_words"], 4);
    assert!(body["completion_code"].is_null());
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (app, _rx) = setup_app(false);
    let uri = format!("/api/sessions/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");
}

#[tokio::test]
async fn test_category_rejected_without_valid_selection() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/category"),
        Some(json!({ "category": "Persuasive_Propaganda" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "selection_out_of_bounds");
    assert!(body["error"].as_str().unwrap().contains("between 4 and 25"));
}

#[tokio::test]
async fn test_unknown_category_name_is_invalid_input() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/category"),
        Some(json!({ "category": "Flag_Waving" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn test_sentinel_category_saves_immediately() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/category"),
        Some(json!({ "category": "No_Polarizing_Language" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "saved");
    assert_eq!(body["annotations"][0]["text"], "no polarizing language selected");
    assert_eq!(body["annotations"][0]["articleTitle"], "senate passes the bill 3");
}

#[tokio::test]
async fn test_remove_annotation() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{id}");

    send(&app, "POST", &format!("{base}/category"), Some(json!({ "category": "No_Polarizing_Language" }))).await;

    let (status, body) = send(&app, "DELETE", &format!("{base}/annotations/4/1"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "annotation_not_found");

    let (status, body) = send(&app, "DELETE", &format!("{base}/annotations/4/0"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "removed");
    assert!(body["annotations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_held_subcategory_confirmed_after_reselecting() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{id}");

    send(&app, "POST", &format!("{base}/selection"), Some(json!({ "text": SPAN }))).await;
    let (_, body) = send(&app, "POST", &format!("{base}/category"), Some(json!({ "category": "Inflammatory_Language" }))).await;
    assert_eq!(body["outcome"], "pending");

    // Selection cleared before the subcategory arrives
    send(&app, "POST", &format!("{base}/selection"), Some(json!({ "text": "" }))).await;
    let (status, body) = send(&app, "POST", &format!("{base}/subcategory"), Some(json!({ "subcategory": "Demonization" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "pending");
    assert_eq!(body["pending_subcategory"], "Demonization");
    assert!(body["annotations"].as_array().unwrap().is_empty());

    send(&app, "POST", &format!("{base}/selection"), Some(json!({ "text": SPAN }))).await;
    let (status, body) = send(&app, "POST", &format!("{base}/confirm"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "saved");
    assert_eq!(body["annotations"][0]["text"], SPAN);
    assert_eq!(body["annotations"][0]["subcategory"], "Demonization");
    assert!(body["pending_subcategory"].is_null());
}

#[tokio::test]
async fn test_confirm_without_pending_choice_rejected() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;

    let (status, body) = send(&app, "POST", &format!("/api/sessions/{id}/confirm"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_category");
}

#[tokio::test]
async fn test_survey_gating() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{id}");

    let (status, body) = send(&app, "POST", &format!("{base}/survey"), Some(json!({ "confidence": 3 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "survey_not_open");

    send(&app, "POST", &format!("{base}/advance"), None).await;

    let (status, body) = send(&app, "POST", &format!("{base}/survey"), Some(json!({ "confidence": 3, "bias": 9 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "rating_out_of_range");

    // The rejected update left confidence unset
    let (status, body) = send(&app, "POST", &format!("{base}/advance"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "missing_confidence");

    send(&app, "POST", &format!("{base}/survey"), Some(json!({ "confidence": 3, "bias": 3, "rationale": RATIONALE }))).await;
    let (status, body) = send(&app, "POST", &format!("{base}/advance"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "missing_annotations");
}

#[tokio::test]
async fn test_full_session_reaches_completion_code_and_sink() {
    let (app, mut rx) = setup_app(false);
    let id = create_session(&app).await;

    let first = annotate_and_survey(&app, &id).await;
    assert_eq!(first["outcome"], "next_article");
    assert_eq!(first["article"]["id"], 1);
    assert!(first["survey"].is_null());

    let second = annotate_and_survey(&app, &id).await;
    assert_eq!(second["outcome"], "next_article");

    let last = annotate_and_survey(&app, &id).await;
    assert_eq!(last["outcome"], "finished");
    assert_eq!(last["state"]["state"], "finished");
    let code = last["completion_code"].as_str().unwrap().to_string();
    assert!(is_completion_code(&code));

    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink should receive the payload")
        .unwrap();
    assert_eq!(payload.completion_code, code);
    assert_eq!(payload.worker_id.as_deref(), Some("W123"));
    assert_eq!(payload.survey_by_article.len(), 3);

    // Finished sessions reject further commands
    let (status, body) = send(&app, "POST", &format!("/api/sessions/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "session_finished");

    // Exactly one submission
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failing_sink_still_returns_completion_code() {
    let app = setup_app_with_sink(Arc::new(FailingSink), false);
    let id = create_session(&app).await;

    for _ in 0..2 {
        annotate_and_survey(&app, &id).await;
    }
    let last = annotate_and_survey(&app, &id).await;
    assert_eq!(last["outcome"], "finished");
    let code = last["completion_code"].as_str().unwrap().to_string();
    assert!(is_completion_code(&code));

    // The failed background submission leaves the finished session intact
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completion_code"], code.as_str());
}

#[tokio::test]
async fn test_production_finish_releases_session() {
    let (app, mut rx) = setup_app(true);
    let id = create_session(&app).await;

    for _ in 0..2 {
        annotate_and_survey(&app, &id).await;
    }
    let last = annotate_and_survey(&app, &id).await;
    assert_eq!(last["outcome"], "finished");
    assert!(is_completion_code(last["completion_code"].as_str().unwrap()));

    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink should receive the payload")
        .unwrap();
    assert_eq!(payload.completion_code, last["completion_code"].as_str().unwrap());

    let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["active_sessions"], 0);
    assert_eq!(health["evicted_sessions"], 1);
}

#[tokio::test]
async fn test_development_finish_keeps_session_for_export() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;
    for _ in 0..3 {
        annotate_and_survey(&app, &id).await;
    }

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["active_sessions"], 1);
    assert_eq!(health["finished_sessions"], 1);
    assert_eq!(health["evicted_sessions"], 0);
}

#[tokio::test]
async fn test_word_count_stream_opens() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;

    let response = app
        .oneshot(test_request("GET", &format!("/api/sessions/{id}/word-count"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
}

// =============================================================================
// Diagnostic export
// =============================================================================

#[tokio::test]
async fn test_export_requires_finished_session() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}/export"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "session_not_finished");
}

#[tokio::test]
async fn test_export_after_finish() {
    let (app, _rx) = setup_app(false);
    let id = create_session(&app).await;
    for _ in 0..3 {
        annotate_and_survey(&app, &id).await;
    }

    let response = app
        .oneshot(test_request("GET", &format!("/api/sessions/{id}/export"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"annotations_"));

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sessionId"], id.as_str());
    assert!(body["annotationsByArticle"]["4"].is_array());
}

#[tokio::test]
async fn test_export_hidden_in_production() {
    let (app, _rx) = setup_app(true);
    let id = create_session(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}/export"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "unavailable");
}
