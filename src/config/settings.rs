//! Application settings and configuration structures.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::infrastructure::network::PACKET_HEADER_LEN;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL content source)
    pub database: DatabaseSettings,

    /// Redis configuration (typing indicator bridge)
    pub redis: RedisSettings,

    /// Access token verification settings
    pub jwt: JwtSettings,

    /// WebSocket endpoint configuration
    pub websocket: WebSocketSettings,

    /// Periodic broadcast configuration
    pub broadcast: BroadcastSettings,

    /// Outbound buffer pool sizing
    pub buffer_pool: BufferPoolSettings,

    /// Outbound byte queue sizing
    pub byte_queue: ByteQueueSettings,

    /// Content delivery limits for `getADS`
    pub content: ContentSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Channel prefix for typing indicators (`<prefix><room>`)
    pub typing_channel_prefix: String,
}

/// Access token verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Base64-encoded PEM of the RSA public key that signs access tokens
    pub public_key: String,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Upgrade endpoint path
    pub path: String,

    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 16KB)
    pub max_frame_size: usize,
}

/// Broadcast loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastSettings {
    /// Tick interval in milliseconds (default: 2000)
    pub interval_ms: u64,

    /// Locale used until a connection selects one
    pub default_locale: String,
}

/// Buffer pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BufferPoolSettings {
    /// Pool name reported by health and metrics
    pub name: String,

    /// Buffers allocated up front and per miss
    pub initial_capacity: usize,

    /// Size of every buffer in bytes; bounds a single packet
    pub buffer_size: usize,
}

/// Byte queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ByteQueueSettings {
    /// Growth increment in bytes (default: 2048)
    pub block_size: usize,
}

/// Content delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSettings {
    /// Records sent for `getADS` without an explicit count
    pub default_count: usize,

    /// Upper bound on records per `getADS`
    pub max_count: usize,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::defaults_builder(&environment)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option(
                "jwt.public_key",
                std::env::var("ACCESS_TOKEN_PUBLIC_KEY").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    /// Settings built from defaults only, without files or environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::defaults_builder("test")?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    fn defaults_builder(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "postgres://localhost:5432/live")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.typing_channel_prefix", "typing:")?
            .set_default("jwt.public_key", "")?
            .set_default("websocket.path", "/stream/live")?
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.max_frame_size", 16384_i64)? // 16KB
            .set_default("broadcast.interval_ms", 2000_i64)?
            .set_default("broadcast.default_locale", "en")?
            .set_default("buffer_pool.name", "outbound")?
            .set_default("buffer_pool.initial_capacity", 64_i64)?
            .set_default("buffer_pool.buffer_size", 16384_i64)?
            .set_default("byte_queue.block_size", 2048_i64)?
            .set_default("content.default_count", 10_i64)?
            .set_default("content.max_count", 50_i64)?
            .set_default("cors.allowed_origins", Vec::<String>::new())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.broadcast.interval_ms == 0 {
            return Err(ConfigError::Message(
                "broadcast.interval_ms must be greater than zero".into(),
            ));
        }
        if self.buffer_pool.buffer_size <= PACKET_HEADER_LEN {
            return Err(ConfigError::Message(format!(
                "buffer_pool.buffer_size must exceed the {} byte packet header",
                PACKET_HEADER_LEN
            )));
        }
        if self.byte_queue.block_size == 0 {
            return Err(ConfigError::Message(
                "byte_queue.block_size must be greater than zero".into(),
            ));
        }
        if self.content.default_count > self.content.max_count {
            return Err(ConfigError::Message(format!(
                "content.default_count ({}) exceeds content.max_count ({})",
                self.content.default_count, self.content.max_count
            )));
        }
        if !self.websocket.path.starts_with('/') {
            return Err(ConfigError::Message(
                "websocket.path must start with '/'".into(),
            ));
        }
        Ok(self)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl BroadcastSettings {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}
