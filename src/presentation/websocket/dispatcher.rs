//! Command Dispatcher
//!
//! Routes decoded commands from one connection: content delivery to the
//! requester, typing relays to the pub/sub bridge and point-to-point
//! signaling to other sessions.

use std::sync::Arc;

use tokio::sync::watch;

use super::connection::{ConnectionError, ConnectionHandle, OutboundFrame};
use super::messages::{
    Command, CommandError, CommandReply, MessageType, SdpAnswerReply, SessionIdReply,
};
use super::registry::ConnectionRegistry;
use super::session::{SessionGuard, SessionState};
use crate::application::services::{AuthError, RelayError, TokenValidator, TypingRelay};
use crate::config::ContentSettings;
use crate::domain::ContentRepository;
use crate::infrastructure::metrics;
use crate::infrastructure::network::{BufferPool, PacketStager, CONTENT_PACKET_ID};
use crate::shared::error::AppError;

/// Dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Token rejected: {0}")]
    Auth(#[from] AuthError),

    #[error("Typing relay failed: {0}")]
    Relay(#[from] RelayError),

    #[error("Content unavailable: {0}")]
    Content(#[from] AppError),

    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Write to peer {target} failed: {source}")]
    Peer {
        target: String,
        source: ConnectionError,
    },

    #[error("Write to own connection failed: {0}")]
    Connection(ConnectionError),
}

impl DispatchError {
    /// Only a broken own connection ends the read loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::Connection(_))
    }
}

/// External collaborators used by command handlers
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentRepository>,
    pub tokens: Arc<dyn TokenValidator>,
    pub typing: Arc<dyn TypingRelay>,
}

/// Shared command router; cloned into every connection task
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<ConnectionRegistry>,
    collaborators: Collaborators,
    pool: Arc<BufferPool>,
    locale_tx: Arc<watch::Sender<String>>,
    limits: ContentSettings,
    block_size: usize,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        collaborators: Collaborators,
        pool: Arc<BufferPool>,
        limits: ContentSettings,
        block_size: usize,
        default_locale: impl Into<String>,
    ) -> Self {
        let (locale_tx, _) = watch::channel(default_locale.into());
        Self {
            registry,
            collaborators,
            pool,
            locale_tx: Arc::new(locale_tx),
            limits,
            block_size,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn content(&self) -> Arc<dyn ContentRepository> {
        Arc::clone(&self.collaborators.content)
    }

    /// Locale requested most recently by any connection
    pub fn locale_receiver(&self) -> watch::Receiver<String> {
        self.locale_tx.subscribe()
    }

    /// Build session state for a fresh connection and register it.
    pub fn open_session(&self, session_id: String, connection: ConnectionHandle) -> SessionGuard {
        let stager = PacketStager::new(Arc::clone(&self.pool), self.block_size);
        let session = SessionState::new(session_id, connection, stager);
        SessionGuard::register(session, Arc::clone(&self.registry))
    }

    /// Handle one text frame from `session`.
    pub async fn dispatch(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<(), DispatchError> {
        session.commands += 1;

        let command = match Command::decode(text) {
            Ok(command) => command,
            Err(e) => {
                metrics::record_command("invalid", "rejected");
                return Err(e.into());
            }
        };

        let message_type = command.message_type();
        let result = self.route(session, command).await;

        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) if e.is_fatal() => "error",
            Err(_) => "rejected",
        };
        metrics::record_command(message_type.as_str(), outcome);

        result
    }

    async fn route(
        &self,
        session: &mut SessionState,
        command: Command,
    ) -> Result<(), DispatchError> {
        match command {
            Command::GetAds { count, locale } => self.send_content(session, count, locale).await,
            Command::UserIsTyping { token, room } => {
                let claims = self.collaborators.tokens.validate(&token).await?;
                self.collaborators.typing.relay_typing(&claims.sub, &room).await?;
                tracing::trace!(session_id = %session.session_id, room = %room, "Typing relayed");
                Ok(())
            }
            Command::GetMySessionId => {
                self.registry
                    .register(session.session_id.clone(), Arc::clone(&session.connection));

                let reply = OutboundFrame::json(&SessionIdReply {
                    session: session.session_id.clone(),
                })?;
                session
                    .connection
                    .send(reply)
                    .await
                    .map_err(DispatchError::Connection)
            }
            Command::WebCall { target, payload } => {
                self.relay(
                    MessageType::WebCall,
                    &session.session_id,
                    &target,
                    OutboundFrame::Text(payload),
                )
                .await
            }
            Command::Reject { targets } => {
                let frame = OutboundFrame::json(&CommandReply::end_call())?;
                for target in targets {
                    if let Err(e) = self
                        .relay(MessageType::Reject, &session.session_id, &target, frame.clone())
                        .await
                    {
                        tracing::debug!(
                            session_id = %session.session_id,
                            error = %e,
                            "Reject notification not delivered"
                        );
                    }
                }
                Ok(())
            }
            Command::SdpAnswer { target, sdp } => {
                let reply = SdpAnswerReply::new(&target, &sdp, &session.session_id);
                self.relay(
                    MessageType::SdpAnswer,
                    &session.session_id,
                    &target,
                    OutboundFrame::json(&reply)?,
                )
                .await
            }
        }
    }

    /// Fetch records and write them to the requester as content packets.
    async fn send_content(
        &self,
        session: &mut SessionState,
        count: Option<usize>,
        locale: Option<String>,
    ) -> Result<(), DispatchError> {
        let count = count
            .unwrap_or(self.limits.default_count)
            .min(self.limits.max_count);

        let locale = match locale {
            Some(locale) => {
                self.publish_locale(&locale);
                locale
            }
            None => self.locale_tx.borrow().clone(),
        };

        let records = self.collaborators.content.fetch_random(count, &locale).await?;

        for record in &records {
            let payload = serde_json::to_vec(record)?;
            if let Err(e) = session.stager.stage(CONTENT_PACKET_ID, &payload) {
                tracing::warn!(
                    session_id = %session.session_id,
                    record_id = record.id,
                    error = %e,
                    "Content record skipped"
                );
            }
        }

        while let Some(frame) = session.stager.next_packet() {
            session
                .connection
                .send(OutboundFrame::Binary(frame))
                .await
                .map_err(DispatchError::Connection)?;
        }

        tracing::debug!(
            session_id = %session.session_id,
            count = records.len(),
            locale = %locale,
            "Content delivered"
        );

        Ok(())
    }

    fn publish_locale(&self, locale: &str) {
        self.locale_tx.send_if_modified(|current| {
            if current.as_str() != locale {
                *current = locale.to_string();
                true
            } else {
                false
            }
        });
    }

    /// Forward a frame to another session. Unknown targets are dropped.
    async fn relay(
        &self,
        message_type: MessageType,
        from: &str,
        target: &str,
        frame: OutboundFrame,
    ) -> Result<(), DispatchError> {
        let Some(peer) = self.registry.lookup(target) else {
            metrics::record_relay_miss(message_type.as_str());
            tracing::debug!(
                session_id = %from,
                target = %target,
                message_type = message_type.as_str(),
                "Relay target not connected"
            );
            return Ok(());
        };

        peer.send(frame).await.map_err(|source| DispatchError::Peer {
            target: target.to_string(),
            source,
        })
    }
}
