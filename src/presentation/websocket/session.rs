//! WebSocket Session Management

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::connection::ConnectionHandle;
use super::registry::ConnectionRegistry;
use crate::infrastructure::network::PacketStager;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Registered,
    Active,
    Unregistering,
    Closed,
}

/// Per-connection session state, owned by the connection's read task
pub struct SessionState {
    pub session_id: String,
    pub connection: ConnectionHandle,
    pub state: ConnectionState,
    pub connected_at: Instant,
    pub commands: u64,
    /// Outbound staging for this connection only
    pub stager: PacketStager,
}

impl SessionState {
    pub fn new(session_id: String, connection: ConnectionHandle, stager: PacketStager) -> Self {
        Self {
            session_id,
            connection,
            state: ConnectionState::Connecting,
            connected_at: Instant::now(),
            commands: 0,
            stager,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("commands", &self.commands)
            .field("pending", &self.stager.pending())
            .finish()
    }
}

/// Tears a session down when dropped.
///
/// Runs on every exit path of the read loop: normal close, socket error
/// and unwinding. The registry entry is removed only while it still
/// belongs to this connection.
pub struct SessionGuard {
    session: SessionState,
    registry: Arc<ConnectionRegistry>,
}

impl SessionGuard {
    /// Register `session` and take ownership of its teardown.
    pub fn register(mut session: SessionState, registry: Arc<ConnectionRegistry>) -> Self {
        registry.register(session.session_id.clone(), Arc::clone(&session.connection));
        session.state = ConnectionState::Registered;

        tracing::info!(session_id = %session.session_id, "Live connection opened");

        Self { session, registry }
    }

    /// Mark the session as reading commands.
    pub fn activate(&mut self) {
        if self.session.state == ConnectionState::Registered {
            self.session.state = ConnectionState::Active;
        }
    }
}

impl Deref for SessionGuard {
    type Target = SessionState;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.state = ConnectionState::Unregistering;

        self.registry
            .unregister_if(&self.session.session_id, &self.session.connection);
        self.session.stager.clear();

        // Close frames need the runtime; a guard dropped outside one only skips the close.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let connection = Arc::clone(&self.session.connection);
            runtime.spawn(async move {
                connection.close().await;
            });
        }

        self.session.state = ConnectionState::Closed;

        tracing::info!(
            session_id = %self.session.session_id,
            commands = self.session.commands,
            elapsed_ms = self.session.elapsed().as_millis() as u64,
            "Live connection closed"
        );
    }
}
