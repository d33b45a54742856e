//! # Live Server
//!
//! Live-connection registry and content fanout server.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and Redis client
//! - HTTP/WebSocket server and the broadcast loop

use anyhow::Result;
use tracing::info;

use live_server::config::Settings;
use live_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    live_server::telemetry::init_tracing();

    info!("Starting Live Server...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        path = %settings.websocket.path,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
