use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::config::{mask_database_url, DatabaseConfig};
use crate::error::{OrchestratorError, OrchestratorResult};

/// Open a pool sized by `config`
pub async fn connect(config: &DatabaseConfig) -> OrchestratorResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| {
            OrchestratorError::DatabaseError(format!(
                "Failed to connect to {}: {e}",
                mask_database_url(&config.url)
            ))
        })?;

    info!(
        url = %mask_database_url(&config.url),
        max_connections = config.max_connections,
        "Database pool established"
    );
    Ok(pool)
}

/// `SELECT 1` round trip
pub async fn health_check(pool: &PgPool) -> OrchestratorResult<bool> {
    let row = sqlx::query("SELECT 1 AS health").fetch_one(pool).await?;
    let health: i32 = row.try_get("health")?;
    Ok(health == 1)
}
