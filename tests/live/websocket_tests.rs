//! WebSocket Endpoint Tests
//!
//! Real upgrades against the full router over an HTTP transport.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

async fn session_id(ws: &mut axum_test::TestWebSocket) -> String {
    ws.send_json(&json!({"messageType": "getMySessionId"})).await;
    let reply: Value = ws.receive_json().await;
    reply["session"]
        .as_str()
        .expect("session id is a string")
        .to_string()
}

#[tokio::test]
async fn test_session_id_is_assigned_on_upgrade() {
    let app = TestApp::with_http_transport();
    let path = app.state.settings.websocket.path.clone();

    let mut ws = app.server.get_websocket(&path).await.into_websocket().await;
    let id = session_id(&mut ws).await;

    assert!(!id.is_empty());
    assert!(app.state.registry.lookup(&id).is_some());
}

#[tokio::test]
async fn test_webcall_and_reject_over_websocket() {
    let app = TestApp::with_http_transport();
    let path = app.state.settings.websocket.path.clone();

    let mut a = app.server.get_websocket(&path).await.into_websocket().await;
    let mut b = app.server.get_websocket(&path).await.into_websocket().await;
    let a_id = session_id(&mut a).await;
    let b_id = session_id(&mut b).await;
    assert!(a_id != b_id);

    a.send_json(&json!({
        "messageType": "webcall",
        "data": [{"id": b_id, "payload": "offer:v=0"}]
    }))
    .await;
    assert_eq!(b.receive_text().await, "offer:v=0");

    a.send_json(&json!({"messageType": "reject", "data": [{"id": b_id}]}))
        .await;
    let reply: Value = b.receive_json().await;
    assert_eq!(reply, json!({"command": "endc"}));

    b.send_json(&json!({"messageType": "reject", "data": [{"id": a_id}]}))
        .await;
    let reply: Value = a.receive_json().await;
    assert_eq!(reply, json!({"command": "endc"}));
}

#[tokio::test]
async fn test_bad_frames_do_not_end_the_session() {
    let app = TestApp::with_http_transport();
    let path = app.state.settings.websocket.path.clone();

    let mut ws = app.server.get_websocket(&path).await.into_websocket().await;
    ws.send_text("not json").await;
    ws.send_json(&json!({"messageType": "teleport"})).await;
    ws.send_json(&json!({"messageType": "webcall", "data": [{"id": "nobody", "payload": "x"}]}))
        .await;

    let id = session_id(&mut ws).await;
    assert!(app.state.registry.lookup(&id).is_some());
}

#[tokio::test]
async fn test_application_stops_on_shutdown_token() {
    use std::time::Duration;

    use live_server::infrastructure::network::all_pools_info;
    use live_server::startup::Application;

    use crate::common::{test_settings, TestCollaborators};

    let mut settings = test_settings();
    settings.server.host = "127.0.0.1".to_string();
    settings.server.port = 0;
    let pool_name = settings.buffer_pool.name.clone();
    let fakes = TestCollaborators::new();

    let app = Application::with_collaborators(settings, fakes.collaborators())
        .await
        .expect("application builds");
    assert!(app.local_addr().unwrap().port() > 0);
    assert!(all_pools_info().iter().any(|p| p.name == pool_name));

    let token = app.shutdown_token();
    let server = tokio::spawn(app.run_until_stopped());
    token.cancel();

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after cancellation")
        .unwrap()
        .unwrap();
    assert!(!all_pools_info().iter().any(|p| p.name == pool_name));
}
