//! Settings table access
//!
//! Key-value settings; the database is the authoritative configuration tier.

use persona_common::Result;
use sqlx::SqlitePool;

/// Read a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Write a setting value (upsert)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Analyzer API key stored in the database
pub async fn get_analyzer_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, "analyzer_api_key").await
}

/// Store the Analyzer API key in the database
pub async fn set_analyzer_api_key(pool: &SqlitePool, key: String) -> Result<()> {
    set_setting(pool, "analyzer_api_key", &key).await
}
