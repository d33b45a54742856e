//! Broadcast Loop Tests

use std::time::Duration;

use pretty_assertions::assert_eq;

use live_server::infrastructure::network::{CONTENT_PACKET_ID, PACKET_HEADER_LEN};
use live_server::presentation::websocket::BroadcastLoop;
use live_server::startup::AppState;

use crate::common::{test_settings, FakeConnection, TestCollaborators};

fn state_with_interval(interval_ms: u64) -> (AppState, TestCollaborators) {
    let fakes = TestCollaborators::new();
    let mut settings = test_settings();
    settings.broadcast.interval_ms = interval_ms;
    (AppState::new(settings, fakes.collaborators()), fakes)
}

#[tokio::test]
async fn test_tick_reaches_every_connection() {
    let (state, _fakes) = state_with_interval(2000);
    let conns: Vec<_> = (0..5).map(|_| FakeConnection::new()).collect();
    for (i, conn) in conns.iter().enumerate() {
        state.registry.register(format!("s{}", i), conn.clone());
    }

    let mut broadcast: BroadcastLoop = state.broadcast_loop();
    let report = broadcast.tick().await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.delivered, 5);
    assert_eq!(report.failed, 0);
    for conn in &conns {
        assert_eq!(conn.binary_count(), 1);
    }
}

#[tokio::test]
async fn test_loop_uses_locale_from_connections_and_stops_on_shutdown() {
    let (state, fakes) = state_with_interval(20);
    let conn = FakeConnection::new();
    state.registry.register("viewer", conn.clone());

    let handle = state.broadcast_loop().spawn();

    // A getADS with a language moves the broadcast locale
    let mut session = state
        .dispatcher
        .open_session("requester".into(), FakeConnection::new());
    state
        .dispatcher
        .dispatch(
            &mut session,
            r#"{"messageType":"getADS","data":[{"count":1,"lang":"ka"}]}"#,
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    state.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("broadcast loop stops after cancellation")
        .unwrap();

    assert!(conn.binary_count() >= 1);
    let locales = fakes.content.locales.lock().clone();
    assert_eq!(locales.last().map(String::as_str), Some("ka"));
    drop(session);
}

#[tokio::test]
async fn test_broadcast_frame_layout() {
    let (state, _fakes) = state_with_interval(2000);
    let viewer = FakeConnection::new();
    state.registry.register("viewer", viewer.clone());

    state.broadcast_loop().tick().await;

    let frames = viewer.binaries();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame[0], CONTENT_PACKET_ID);
    let len = u16::from_be_bytes([frame[1], frame[2]]) as usize;
    assert_eq!(frame.len(), PACKET_HEADER_LEN + len);

    let record: serde_json::Value = serde_json::from_slice(&frame[PACKET_HEADER_LEN..]).unwrap();
    assert!(record.get("title").is_some());
    assert!(record["author"].get("id").is_some());
}
