//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chat_runtime::{
    api::create_router,
    error::RequestError,
    scheduler::{BatchEnvelope, BatchReply, PreparedRequest, Transport},
    AppState, Config, RuntimeServices,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

/// Echoes the request path; `/down` fails with a connection error.
struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<Value, RequestError> {
        match request.path().as_str() {
            "/down" => Err(RequestError::Connection("refused".into())),
            path => Ok(json!({ "path": path, "method": request.method })),
        }
    }

    async fn send_batch(
        &self,
        _origin: &str,
        _batch: &BatchEnvelope,
    ) -> Result<BatchReply, RequestError> {
        Err(RequestError::Status {
            status: 404,
            body: String::new(),
        })
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.cache.max_size = 4096;
    config.cache.max_entries = 100;
    config.scheduler.base_url = Some("http://backend.test".to_string());
    config.scheduler.base_delay = Duration::from_millis(1);
    config.scheduler.max_retries = 1;
    config.scheduler.batch_delay = Duration::from_millis(5);
    config.scheduler.offline_timeout = Duration::from_millis(50);
    config.pool.size = 2;
    config
}

fn create_test_app() -> (Router, AppState) {
    let services = RuntimeServices::with_transport(test_config(), Arc::new(EchoTransport));
    let state = AppState::new(services);
    (create_router(state.clone()), state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/cache",
            json!({"key": "user:1", "value": {"name": "Ada", "tags": ["a", "b"]}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("user:1"));

    let response = app
        .oneshot(empty_request("GET", "/cache/user:1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], json!({"name": "Ada", "tags": ["a", "b"]}));
}

#[tokio::test]
async fn test_set_with_ttl_expires() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/cache",
            json!({"key": "short", "value": 1, "ttl_ms": 30}),
        ))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    let response = app
        .oneshot(empty_request("GET", "/cache/short"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_empty_key_is_bad_request() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/cache", json!({"key": "", "value": 1})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_oversized_value_is_rejected() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/cache",
            json!({"key": "big", "value": "x".repeat(8192)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
    assert_eq!(state.services.cache().stats().rejections, 1);
}

#[tokio::test]
async fn test_delete_missing_key_is_not_found() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(empty_request("DELETE", "/cache/nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_clear_reports_removed_entries() {
    let (app, state) = create_test_app();
    state.services.cache().set("a", json!(1), None);
    state.services.cache().set("b", json!(2), None);

    let response = app
        .oneshot(empty_request("DELETE", "/cache"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
}

// == Fetch Endpoint Tests ==

#[tokio::test]
async fn test_fetch_reads_through_cache() {
    let (app, _) = create_test_app();
    let body = json!({
        "request": {"url": "/articles", "priority": "high"},
        "cache_key": "articles"
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/fetch", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_to_json(response.into_body()).await;
    assert_eq!(first["cached"], false);
    assert_eq!(first["data"]["path"], "/articles");

    let response = app
        .oneshot(json_request("POST", "/fetch", body))
        .await
        .unwrap();
    let second = body_to_json(response.into_body()).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["data"], first["data"]);
}

#[tokio::test]
async fn test_fetch_batched_request() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/fetch",
            json!({"request": {"url": "/low", "method": "POST", "data": {"q": 1}, "priority": "low"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["data"], json!({"path": "/low", "method": "POST"}));
}

#[tokio::test]
async fn test_fetch_connection_failure_is_bad_gateway() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/fetch",
            json!({"request": {"url": "/down", "priority": "high"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    // max_retries = 1 gives two attempts
    assert_eq!(state.services.scheduler().stats().attempts, 2);
}

#[tokio::test]
async fn test_fetch_while_offline_times_out() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/network", json!({"online": false})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            "/fetch",
            json!({"request": {"url": "/anything"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// == Task Endpoint Tests ==

#[tokio::test]
async fn test_hash_task() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/tasks",
            json!({"task": {"type": "hash", "data": {"text": "abc"}}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(
        json["result"]["hash"],
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[tokio::test]
async fn test_failing_task_is_unprocessable() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/tasks",
            json!({"task": {"type": "parse_json", "data": {"text": "{broken"}}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("invalid JSON"));
}

// == Network, Stats and Health Tests ==

#[tokio::test]
async fn test_network_update_requires_a_field() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/network", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_cover_all_components() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(empty_request("GET", "/cache/missing"))
        .await
        .unwrap();

    let response = app.oneshot(empty_request("GET", "/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["cache"]["misses"], 1);
    assert_eq!(json["cache"]["max_entries"], 100);
    assert_eq!(json["scheduler"]["online"], true);
    assert_eq!(json["pool"]["size"], 2);
}

#[tokio::test]
async fn test_health_reports_connectivity() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(json_request("PUT", "/network", json!({"quality": "slow"})))
        .await
        .unwrap();

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["quality"], "slow");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(empty_request("GET", "/nonexistent"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
