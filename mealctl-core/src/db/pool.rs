//! Database connection pool management

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::config::{DatabaseConfig, DEFAULT_MAX_CONNECTIONS};

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/mealctl").await?;
/// ```
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Create a PostgreSQL connection pool with custom options.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - Maximum number of connections in the pool
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    debug!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Pool for the `[database]` config section.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(&config.url, config.max_connections).await
}
