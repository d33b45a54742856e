//! Application Startup
//!
//! Application building and server initialization.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::JwtTokenValidator;
use crate::config::Settings;
use crate::infrastructure::cache::{self, RedisTypingRelay};
use crate::infrastructure::database;
use crate::infrastructure::network::BufferPool;
use crate::infrastructure::repositories::PgContentRepository;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};
use crate::presentation::websocket::{
    BroadcastLoop, Collaborators, CommandDispatcher, ConnectionRegistry,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub pool: Arc<BufferPool>,
    pub dispatcher: CommandDispatcher,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the registry, outbound pool and dispatcher around `collaborators`.
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let pool = BufferPool::new(
            settings.buffer_pool.name.clone(),
            settings.buffer_pool.initial_capacity,
            settings.buffer_pool.buffer_size,
        );

        let dispatcher = CommandDispatcher::new(
            Arc::clone(&registry),
            collaborators,
            Arc::clone(&pool),
            settings.content.clone(),
            settings.byte_queue.block_size,
            settings.broadcast.default_locale.clone(),
        );

        Self {
            settings: Arc::new(settings),
            registry,
            pool,
            dispatcher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Broadcast loop sharing this state's registry, pool and locale channel.
    pub fn broadcast_loop(&self) -> BroadcastLoop {
        BroadcastLoop::new(
            Arc::clone(&self.registry),
            self.dispatcher.content(),
            Arc::clone(&self.pool),
            self.settings.byte_queue.block_size,
            self.settings.broadcast.interval(),
            self.dispatcher.locale_receiver(),
            self.shutdown.clone(),
        )
    }
}

/// Build the full router with middleware
pub fn create_app(state: AppState) -> Router {
    let cors = create_cors_layer(&state.settings.cors);

    routes::create_router(state)
        .layer(create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database)
            .await
            .context("Failed to connect to PostgreSQL")?;
        tracing::info!("Database connection pool created");

        // Create Redis client
        let redis = cache::create_redis_client(&settings.redis)
            .await
            .context("Failed to connect to Redis")?;

        let tokens = JwtTokenValidator::from_base64_pem(&settings.jwt.public_key)
            .context("Invalid ACCESS_TOKEN_PUBLIC_KEY")?;

        let collaborators = Collaborators {
            content: Arc::new(PgContentRepository::new(db)),
            tokens: Arc::new(tokens),
            typing: Arc::new(RedisTypingRelay::new(
                redis,
                settings.redis.typing_channel_prefix.clone(),
            )),
        };

        Self::with_collaborators(settings, collaborators).await
    }

    /// Build the application around already-constructed collaborators
    pub async fn with_collaborators(
        settings: Settings,
        collaborators: Collaborators,
    ) -> Result<Self> {
        health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::new(settings, collaborators);
        let router = create_app(state.clone());

        // Bind to address
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Run the server until a shutdown signal or token cancellation
    pub async fn run_until_stopped(self) -> Result<()> {
        let serve = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal(self.state.shutdown.clone()));

        serve_with_broadcast(self.state, serve).await
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Drive `serve` alongside the broadcast loop.
///
/// Whatever `serve` returns, the loop is stopped and awaited and the
/// outbound pool leaves the directory before the result is passed on.
async fn serve_with_broadcast<F>(state: AppState, serve: F) -> Result<()>
where
    F: IntoFuture<Output = std::io::Result<()>>,
{
    let broadcast = state.broadcast_loop().spawn();

    let served = serve.await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "Server failed");
    }

    state.shutdown.cancel();
    if let Err(e) = broadcast.await {
        tracing::warn!(error = %e, "Broadcast loop ended abnormally");
    }
    state.pool.free();

    tracing::info!("Server stopped");
    served.context("Server error")
}

/// Resolve on Ctrl+C, SIGTERM or token cancellation, cancelling the token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutdown signal received"),
        _ = terminate => tracing::info!("Termination signal received"),
        _ = token.cancelled() => {}
    }

    token.cancel();
}
