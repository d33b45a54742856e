//! Live Session Tests
//!
//! Two sessions driven through their read loops over in-memory frame
//! streams.

use axum::extract::ws::Message;
use futures::channel::mpsc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use live_server::presentation::websocket::{run_session, CommandDispatcher};

use crate::common::{test_settings, FakeConnection, TestCollaborators, TEST_USER_ID, VALID_TOKEN};
use live_server::startup::AppState;

type Inbound = mpsc::UnboundedSender<Result<Message, axum::Error>>;

struct Peer {
    id: String,
    conn: std::sync::Arc<FakeConnection>,
    inbound: Inbound,
    task: JoinHandle<()>,
}

impl Peer {
    fn open(dispatcher: &CommandDispatcher, id: &str) -> Self {
        let conn = FakeConnection::new();
        let session = dispatcher.open_session(id.to_string(), conn.clone());
        let (inbound, frames) = mpsc::unbounded();

        let dispatcher = dispatcher.clone();
        let task = tokio::spawn(async move {
            run_session(&dispatcher, session, frames).await;
        });

        Self {
            id: id.to_string(),
            conn,
            inbound,
            task,
        }
    }

    fn send(&self, value: Value) {
        self.inbound
            .unbounded_send(Ok(Message::Text(value.to_string().into())))
            .expect("read loop alive");
    }

    async fn close(self) {
        drop(self.inbound);
        self.task.await.expect("read loop exits cleanly");
    }
}

fn state() -> (AppState, TestCollaborators) {
    let fakes = TestCollaborators::new();
    let state = AppState::new(test_settings(), fakes.collaborators());
    (state, fakes)
}

#[tokio::test]
async fn test_webcall_and_reject_between_sessions() {
    let (state, _fakes) = state();
    let a = Peer::open(&state.dispatcher, "session-a");
    let b = Peer::open(&state.dispatcher, "session-b");

    b.send(json!({"messageType": "getMySessionId"}));
    let texts = b.conn.wait_for_texts(1).await;
    let reply: Value = serde_json::from_str(&texts[0]).unwrap();
    assert_eq!(reply, json!({"session": "session-b"}));

    a.send(json!({
        "messageType": "webcall",
        "data": [{"id": &b.id, "payload": "offer:sdp-blob"}]
    }));
    let texts = b.conn.wait_for_texts(2).await;
    assert_eq!(texts[1], "offer:sdp-blob");

    a.send(json!({"messageType": "reject", "data": [{"id": &b.id}]}));
    let texts = b.conn.wait_for_texts(3).await;
    assert_eq!(texts[2], r#"{"command":"endc"}"#);

    assert!(a.conn.texts().is_empty());

    // B hangs up on A
    b.send(json!({"messageType": "reject", "data": [{"id": &a.id}]}));
    let texts = a.conn.wait_for_texts(1).await;
    assert_eq!(texts, vec![r#"{"command":"endc"}"#.to_string()]);
    assert_eq!(b.conn.texts().len(), 3);

    a.close().await;
    b.close().await;
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_sdp_answer_reaches_caller() {
    let (state, _fakes) = state();
    let caller = Peer::open(&state.dispatcher, "caller");
    let callee = Peer::open(&state.dispatcher, "callee");

    callee.send(json!({
        "messageType": "sdpAnswer",
        "data": [{"sessionID": "caller", "sdpAnswer": "v=0 o=- 1 1 IN IP4 0.0.0.0"}]
    }));

    let texts = caller.conn.wait_for_texts(1).await;
    let reply: Value = serde_json::from_str(&texts[0]).unwrap();
    assert_eq!(
        reply,
        json!({
            "command": "sdpAnswer",
            "userb": "caller",
            "sdp": "v=0 o=- 1 1 IN IP4 0.0.0.0",
            "usera": "callee"
        })
    );

    caller.close().await;
    callee.close().await;
}

#[tokio::test]
async fn test_relay_to_departed_session_is_dropped() {
    let (state, _fakes) = state();
    let a = Peer::open(&state.dispatcher, "a");
    let b = Peer::open(&state.dispatcher, "b");
    let b_conn = b.conn.clone();

    b.close().await;
    assert!(state.registry.lookup("b").is_none());

    a.send(json!({"messageType": "webcall", "data": [{"id": "b", "payload": "late"}]}));
    a.send(json!({"messageType": "getMySessionId"}));

    a.conn.wait_for_texts(1).await;
    assert!(b_conn.texts().is_empty());

    a.close().await;
}

#[tokio::test]
async fn test_typing_indicator_relayed_for_valid_token() {
    let (state, fakes) = state();
    let a = Peer::open(&state.dispatcher, "a");

    a.send(json!({
        "messageType": "UserIsTyping",
        "data": [{"token": "forged", "room": "room-1"}]
    }));
    a.send(json!({
        "messageType": "UserIsTyping",
        "data": [{"token": VALID_TOKEN, "room": "room-1"}]
    }));
    a.close().await;

    assert_eq!(
        *fakes.typing.relayed.lock(),
        vec![(TEST_USER_ID.to_string(), "room-1".to_string())]
    );
}

#[tokio::test]
async fn test_get_ads_caps_count_and_moves_broadcast_locale() {
    let (state, fakes) = state();
    let locale = state.dispatcher.locale_receiver();
    let max = state.settings.content.max_count;
    let a = Peer::open(&state.dispatcher, "a");

    a.send(json!({"messageType": "getADS", "data": [{"count": max + 25, "lang": "ru"}]}));
    a.send(json!({"messageType": "getMySessionId"}));
    a.conn.wait_for_texts(1).await;

    assert_eq!(a.conn.binary_count(), max);
    assert_eq!(*fakes.content.locales.lock(), vec!["ru".to_string()]);
    assert_eq!(*locale.borrow(), "ru");

    a.close().await;
}
