//! Database migration command.
//!
//! Applies the SQL files in `crates/server/migrations/` to the database
//! named by `NEYISEK_DATABASE_URL` (or `DATABASE_URL`).
//!
//! ```bash
//! neyisek migrate
//! ```

use neyisek_server::config::get_required_env;
use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: NEYISEK_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Read the database URL from the environment, loading `.env` first.
///
/// # Errors
///
/// Returns `MigrationError::MissingDatabaseUrl` if neither variable is set.
pub fn database_url() -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    let lookup = |key: &str| std::env::var(key).ok();
    get_required_env(&lookup, "NEYISEK_DATABASE_URL")
        .or_else(|_| get_required_env(&lookup, "DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingDatabaseUrl)
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = neyisek_server::db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
