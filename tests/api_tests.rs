use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use code_scribe::config::Config;
use code_scribe::error::NOT_CONFIGURED_MESSAGE;
use code_scribe::server::{AppState, router};
use code_scribe::service::{CodeAssistant, EMPTY_QUERY_REPLY};

use test_utils::{StubModel, fenced_explanation};

const CODE: &str = "def add(a, b):\n    return a + b";

fn app_with(stub: Arc<StubModel>) -> Router {
    router(AppState::configured(CodeAssistant::new(stub), "python"))
}

fn analyze_stub() -> Arc<StubModel> {
    StubModel::routed(
        Ok(&fenced_explanation(
            "<h4>High-Level Summary</h4><p>Adds.</p>",
            "graph TD; A[Start] --> B[Add];",
        )),
        Ok("```python\ndef add(a: int, b: int) -> int:\n    return a + b\n```"),
    )
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_analyze_explain() {
    let stub = analyze_stub();
    let (status, body) = send(
        app_with(stub.clone()),
        post_json("/api/analyze", &json!({"code": CODE, "action": "explain"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["explanation_html"],
        "<h4>High-Level Summary</h4><p>Adds.</p>"
    );
    assert_eq!(body["mermaid_code"], "graph TD; A[Start] --> B[Add];");
    assert!(body.get("refactored_code").is_none());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_analyze_refactor() {
    let stub = analyze_stub();
    let (status, body) = send(
        app_with(stub.clone()),
        post_json(
            "/api/analyze",
            &json!({"code": CODE, "action": "refactor", "instructions": "Add type hints"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["explanation_html"], "<h4>High-Level Summary</h4><p>Adds.</p>");
    assert_eq!(
        body["refactored_code"],
        "def add(a: int, b: int) -> int:\n    return a + b"
    );
    assert_eq!(stub.calls(), 2);
    assert!(
        stub.requests()
            .iter()
            .any(|r| r.prompt.contains("**User Instructions:** Add type hints"))
    );
}

#[tokio::test]
async fn test_analyze_garbage_reply_still_succeeds() {
    let (status, body) = send(
        app_with(StubModel::replying("not json at all")),
        post_json("/api/analyze", &json!({"code": CODE, "action": "explain"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mermaid_code"], "graph TD; error[An error occurred];");
    assert!(
        body["explanation_html"]
            .as_str()
            .unwrap_or_default()
            .contains("Failed to parse JSON from model response.")
    );
}

#[tokio::test]
async fn test_analyze_missing_fields() {
    for payload in [
        json!({"code": CODE}),
        json!({"action": "explain"}),
        json!({}),
    ] {
        let stub = analyze_stub();
        let (status, body) = send(app_with(stub.clone()), post_json("/api/analyze", &payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload}");
        assert!(
            body["error"]
                .as_str()
                .unwrap_or_default()
                .contains("\"code\" and \"action\" are required")
        );
        assert_eq!(stub.calls(), 0);
    }
}

#[tokio::test]
async fn test_analyze_invalid_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("Failed to build request");

    let (status, body) = send(app_with(analyze_stub()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_analyze_unknown_action() {
    let stub = analyze_stub();
    let (status, body) = send(
        app_with(stub.clone()),
        post_json("/api/analyze", &json!({"code": CODE, "action": "translate"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("Unsupported action 'translate'")
    );
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_default_language_is_applied() {
    let stub = analyze_stub();
    send(
        app_with(stub.clone()),
        post_json("/api/analyze", &json!({"code": CODE, "action": "explain"})),
    )
    .await;
    assert!(stub.requests()[0].prompt.contains("```python\n"));

    let stub = analyze_stub();
    send(
        app_with(stub.clone()),
        post_json(
            "/api/analyze",
            &json!({"code": "fn main() {}", "action": "explain", "language": "rust"}),
        ),
    )
    .await;
    assert!(stub.requests()[0].prompt.contains("```rust\nfn main() {}\n```"));
}

#[tokio::test]
async fn test_chat() {
    let stub = StubModel::replying("It returns the sum of a and b.");
    let (status, body) = send(
        app_with(stub.clone()),
        post_json("/api/chat", &json!({"code": CODE, "query": "What does add return?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "It returns the sum of a and b."}));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_chat_empty_query() {
    let stub = StubModel::replying("unused");
    let (status, body) = send(
        app_with(stub.clone()),
        post_json("/api/chat", &json!({"code": CODE, "query": ""})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], EMPTY_QUERY_REPLY);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_chat_missing_query() {
    let (status, body) = send(
        app_with(StubModel::replying("unused")),
        post_json("/api/chat", &json!({"code": CODE})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid request: \"code\" and \"query\" are required."
    );
}

#[tokio::test]
async fn test_unconfigured_server() {
    let cases = [
        ("/api/analyze", json!({"code": CODE, "action": "explain"})),
        ("/api/analyze", json!({})),
        ("/api/chat", json!({"code": CODE, "query": "Why?"})),
        ("/api/chat", json!({"code": CODE})),
    ];

    for (uri, payload) in cases {
        let app = router(AppState::unconfigured("python"));
        let (status, body) = send(app, post_json(uri, &payload)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri} {payload}");
        assert_eq!(body["error"], NOT_CONFIGURED_MESSAGE);
    }
}

#[tokio::test]
async fn test_startup_without_credential_answers_not_configured() {
    let mut placeholder = Config::default();
    placeholder.apply_env_overrides(|key| {
        (key == "GOOGLE_API_KEY").then(|| "YOUR_API_KEY_HERE".to_string())
    });

    for config in [Config::default(), placeholder] {
        for (uri, payload) in [
            ("/api/analyze", json!({"code": CODE, "action": "refactor"})),
            ("/api/chat", json!({"code": CODE, "query": "Why?"})),
        ] {
            let app = router(AppState::from_config(&config));
            let (status, body) = send(app, post_json(uri, &payload)).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(body, json!({"error": NOT_CONFIGURED_MESSAGE}));
        }
    }
}

#[tokio::test]
async fn test_index_page() {
    let request = Request::builder()
        .uri("/")
        .body(Body::empty())
        .expect("Failed to build request");
    let response = app_with(analyze_stub())
        .oneshot(request)
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("/api/analyze"));
}
