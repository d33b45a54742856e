//! Live Connection Handles
//!
//! A connection handle is the write side of one WebSocket. The registry,
//! the broadcast loop and peer relays all hold the same `Arc` handle;
//! writes on one socket are serialized by the handle's own lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::Mutex;

/// A frame queued for one socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Control and signaling JSON
    Text(String),
    /// Content packets
    Binary(Bytes),
}

impl OutboundFrame {
    /// Serialize `value` as a text frame.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(OutboundFrame::Text)
    }

    pub fn len(&self) -> usize {
        match self {
            OutboundFrame::Text(text) => text.len(),
            OutboundFrame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<OutboundFrame> for Message {
    fn from(frame: OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Text(text) => Message::Text(text.into()),
            OutboundFrame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

/// Connection write errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,

    #[error("Write failed: {0}")]
    Write(String),
}

/// Exclusive-write handle to one live socket
#[async_trait]
pub trait Connection: Send + Sync {
    /// Write one frame. Concurrent callers are serialized.
    async fn send(&self, frame: OutboundFrame) -> Result<(), ConnectionError>;

    /// Send a close frame and stop accepting writes. Idempotent.
    async fn close(&self);
}

/// Shared connection handle stored in the registry
pub type ConnectionHandle = Arc<dyn Connection>;

/// WebSocket-backed connection handle
pub struct WsConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    closed: AtomicBool,
}

impl WsConnection {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    /// Wrap a sink straight into a shareable handle.
    pub fn handle(sink: SplitSink<WebSocket, Message>) -> ConnectionHandle {
        Arc::new(Self::new(sink))
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&self, frame: OutboundFrame) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }

        let mut sink = self.sink.lock().await;
        sink.send(frame.into()).await.map_err(|e| {
            self.closed.store(true, Ordering::Release);
            ConnectionError::Write(e.to_string())
        })
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut sink = self.sink.lock().await;
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    }
}
