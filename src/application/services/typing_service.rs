//! Typing Indicator Relay
//!
//! Contract for forwarding "user is typing" signals to a room through an
//! external pub/sub bridge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Typing indicator payload published to a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub user_id: String,
    pub room: String,
    pub timestamp: i64,
}

impl TypingIndicator {
    pub fn now(user_id: &str, room: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            room: room.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Relay errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Pub/sub bridge for typing indicators
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TypingRelay: Send + Sync {
    async fn relay_typing(&self, user_id: &str, room: &str) -> Result<(), RelayError>;
}
