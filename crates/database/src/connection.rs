use crate::error::DbError;
use configuration::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The URL is taken from the configuration, falling back to `DATABASE_URL`
/// (loaded from the `.env` file when one exists).
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let database_url = match &config.url {
        Some(url) => url.clone(),
        None => {
            dotenvy::dotenv().ok();
            env::var("DATABASE_URL").map_err(|_e| {
                DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string())
            })?
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&database_url)
        .await?;

    tracing::debug!(max_connections = config.max_connections, "Connected to the ledger database.");
    Ok(pool)
}

/// Applies the schema migrations embedded from `./migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
