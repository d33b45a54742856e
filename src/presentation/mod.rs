//! Presentation Layer
//!
//! HTTP routes and the WebSocket live stream.

pub mod http;
pub mod middleware;
pub mod websocket;
