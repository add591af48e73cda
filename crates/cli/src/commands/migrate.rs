//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! oi-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `OPEN_IMPACT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Account migrations live in `crates/web/migrations/`. The session table
//! (`tower_sessions.session`) is created by the session store itself.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Could not connect.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Database error (session store migration).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run account and session migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running account migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
