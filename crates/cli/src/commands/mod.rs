//! CLI subcommands.

pub mod account;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;

/// Database URL from `OPEN_IMPACT_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    ["OPEN_IMPACT_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .map(SecretString::from)
}

/// Connect to the Open Impact database.
///
/// # Errors
///
/// Returns `ConnectError::MissingEnvVar` if no database URL is set, or
/// `ConnectError::Database` if the connection fails.
async fn connect() -> Result<PgPool, ConnectError> {
    let database_url = database_url().ok_or(ConnectError::MissingEnvVar(
        "OPEN_IMPACT_DATABASE_URL",
    ))?;

    tracing::info!("Connecting to database...");
    Ok(open_impact_web::db::create_pool(&database_url).await?)
}

/// Errors connecting to the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
