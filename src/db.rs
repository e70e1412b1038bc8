//! SQLite connection pool and embedded migrations.

use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// The shared database pool type.
pub type Db = sqlx::SqlitePool;

/// Connect to the database at `url`, creating it if missing, and apply pending migrations.
#[tracing::instrument(skip_all)]
pub async fn establish_pool(url: &str) -> Result<Db> {
    tracing::debug!("establishing database pool for {url}");

    let opts = SqliteConnectOptions::from_str(url)
        .context("failed to parse database options")?
        .create_if_missing(true)
        .foreign_keys(true);

    let db = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(opts)
        .await
        .context("failed to connect to SQLite database")?;

    sqlx::migrate!()
        .run(&db)
        .await
        .context("failed to apply migrations")?;

    Ok(db)
}

/// A private in-memory database. Single connection, since every `:memory:`
/// connection is its own database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> Db {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid memory url")
        .foreign_keys(true);
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .expect("in-memory database");
    sqlx::migrate!().run(&db).await.expect("migrations apply");
    db
}
