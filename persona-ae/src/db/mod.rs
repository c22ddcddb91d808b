//! Database access for persona-ae
//!
//! SQLite via sqlx. Schema is bootstrapped at pool initialization.

pub mod jobs;
pub mod schema;
pub mod sessions;
pub mod settings;

use persona_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Initialize database connection pool and bootstrap the schema
///
/// Store operations carry explicit timeouts: connection acquisition and the
/// SQLite busy handler are both bounded so a wedged database surfaces as an
/// error instead of a hang.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .map_err(persona_common::Error::Store)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    schema::create_schema(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory pool with the full schema (test support)
///
/// Pinned to a single connection: every pooled connection to `:memory:`
/// would otherwise open its own empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    schema::create_schema(&pool).await?;
    Ok(pool)
}
