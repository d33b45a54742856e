//! Health Check API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{FakeConnection, TestApp};

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

/// Test readiness reports live connections and buffer pools
#[tokio::test]
async fn test_readiness_reports_connections_and_pools() {
    let app = TestApp::new();
    app.state.registry.register("a", FakeConnection::new());
    app.state.registry.register("b", FakeConnection::new());

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["live_connections"], 2);
    assert_eq!(json["broadcast_running"], true);

    let pool_name = app.state.pool.name().to_string();
    let pools = json["buffer_pools"].as_array().unwrap();
    assert!(pools.iter().any(|p| p["name"] == pool_name.as_str()));
}

/// Test readiness fails once shutdown begins
#[tokio::test]
async fn test_readiness_unavailable_after_shutdown() {
    let app = TestApp::new();
    app.state.shutdown.cancel();

    let response = app.server.get("/health/ready").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["status"], "unhealthy");
}

/// Test metrics endpoint exposes the live server metrics
#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    app.server.get("/health").await;

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("live_server_http_requests_total"));
    assert!(body.contains("live_server_buffer_pool_buffers"));
}
