//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Outbound packet primitives (byte queue, buffer pool, staging)
//! - Database repositories (PostgreSQL)
//! - Redis connection and typing relay
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod metrics;
pub mod network;
pub mod repositories;
