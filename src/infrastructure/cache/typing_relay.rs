//! Typing Indicator Relay
//!
//! Redis pub/sub implementation of the typing indicator bridge.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::application::services::{RelayError, TypingIndicator, TypingRelay};

/// Publishes typing indicators on `<prefix><room>` channels
#[derive(Clone)]
pub struct RedisTypingRelay {
    redis: ConnectionManager,
    channel_prefix: String,
}

impl RedisTypingRelay {
    /// Create a new typing relay
    pub fn new(redis: ConnectionManager, channel_prefix: impl Into<String>) -> Self {
        Self {
            redis,
            channel_prefix: channel_prefix.into(),
        }
    }

    fn channel(&self, room: &str) -> String {
        format!("{}{}", self.channel_prefix, room)
    }
}

#[async_trait]
impl TypingRelay for RedisTypingRelay {
    async fn relay_typing(&self, user_id: &str, room: &str) -> Result<(), RelayError> {
        let payload = serde_json::to_string(&TypingIndicator::now(user_id, room))?;
        let channel = self.channel(room);

        let mut conn = self.redis.clone();
        let receivers: i64 = conn
            .publish(&channel, payload)
            .await
            .map_err(|e| RelayError::Publish(format!("Redis error: {}", e)))?;

        tracing::trace!(channel = %channel, receivers, "Typing indicator published");

        Ok(())
    }
}
