//! # Live Server Library
//!
//! This crate provides the live-connection core of a marketplace backend:
//! - A session-keyed registry of live WebSocket connections
//! - A periodic broadcast loop pushing random listings to every connection
//! - Command routing for content requests, typing indicators and call signaling
//! - Pooled buffers and a circular byte queue for outbound packets
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Content records and the repository trait
//! - **Application Layer**: Token validation and typing relay contracts
//! - **Infrastructure Layer**: PostgreSQL, Redis, metrics and packet primitives
//! - **Presentation Layer**: WebSocket live stream and health endpoints
//!
//! ## Module Structure
//!
//! ```text
//! live_server/
//! +-- config/         Configuration management
//! +-- domain/         Content entities and traits
//! +-- application/    Auth and typing service contracts
//! +-- infrastructure/ Database, cache, metrics, byte queue and buffer pool
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, session ids)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
