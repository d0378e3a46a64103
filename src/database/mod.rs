//! # Database
//!
//! PostgreSQL pool setup and schema migrations for [`PgPublicationStore`].
//!
//! Migrations live in `migrations/` and are embedded at compile time.
//!
//! ```rust,no_run
//! use publisher_core::config::DatabaseConfig;
//! use publisher_core::database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = database::connect(&DatabaseConfig::default()).await?;
//! database::run_migrations(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`PgPublicationStore`]: crate::store::PgPublicationStore

pub mod connection;

pub use connection::{connect, health_check};

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::info;

use crate::error::OrchestratorResult;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply any migrations the database has not seen yet
pub async fn run_migrations(pool: &PgPool) -> OrchestratorResult<()> {
    MIGRATOR.run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
