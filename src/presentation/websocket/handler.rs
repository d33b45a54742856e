//! WebSocket Connection Handler
//!
//! Upgrades live connections and runs the per-connection read loop.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Stream, StreamExt};

use super::connection::WsConnection;
use super::dispatcher::CommandDispatcher;
use super::session::SessionGuard;
use crate::shared::session_id::generate_session_id;
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limits = &state.settings.websocket;
    let dispatcher = state.dispatcher.clone();

    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, dispatcher))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, dispatcher: CommandDispatcher) {
    let session_id = generate_session_id();

    tracing::debug!(session_id = %session_id, "New WebSocket connection");

    // Split socket so peers and the broadcast loop can write while we read
    let (sender, receiver) = socket.split();
    let session = dispatcher.open_session(session_id, WsConnection::handle(sender));

    run_session(&dispatcher, session, receiver).await;
}

/// Read commands until the peer leaves or its socket fails.
///
/// Dropping the guard on return unregisters the session and closes it.
pub async fn run_session<S>(
    dispatcher: &CommandDispatcher,
    mut session: SessionGuard,
    mut stream: S,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    session.activate();

    while let Some(msg) = stream.next().await {
        let keep_reading = match msg {
            Ok(Message::Text(text)) => handle_command(dispatcher, &mut session, text.as_str()).await,
            // Envelopes may also arrive in binary frames
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => handle_command(dispatcher, &mut session, text).await,
                Err(e) => {
                    tracing::debug!(
                        session_id = %session.session_id,
                        len = data.len(),
                        error = %e,
                        "Dropping binary frame that is not UTF-8"
                    );
                    true
                }
            },
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session.session_id, "Connection closed");
                false
            }
            Ok(_) => {
                // Pong is handled automatically by axum
                true
            }
            Err(e) => {
                tracing::debug!(session_id = %session.session_id, error = %e, "WebSocket error");
                false
            }
        };

        if !keep_reading {
            break;
        }
    }
}

/// Dispatch one envelope. Returns `false` once the connection is unusable.
async fn handle_command(
    dispatcher: &CommandDispatcher,
    session: &mut SessionGuard,
    text: &str,
) -> bool {
    match dispatcher.dispatch(session, text).await {
        Ok(()) => true,
        Err(e) if e.is_fatal() => {
            tracing::debug!(
                session_id = %session.session_id,
                error = %e,
                "Connection write failed"
            );
            false
        }
        Err(e) => {
            tracing::debug!(
                session_id = %session.session_id,
                error = %e,
                "Error handling message"
            );
            true
        }
    }
}
