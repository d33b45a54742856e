//! Database Module
//!
//! PostgreSQL connection pool for the content source. The schema is owned
//! by the marketplace backend; this server only reads from it.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::DatabaseSettings;

/// Create a PostgreSQL connection pool
#[instrument(skip(settings), fields(max = settings.max_connections))]
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .test_before_acquire(true)
        .connect(&settings.url)
        .await?;

    info!(size = pool.size(), "PostgreSQL pool ready");
    Ok(pool)
}
