//! Configuration resolution for persona-ae
//!
//! Analyzer credentials and endpoints resolve with Database → ENV → TOML
//! priority. The database is authoritative; environment variables and the
//! TOML file are operator conveniences.

use persona_common::config::TomlConfig;
use persona_common::{Error, Result};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::AnalyzerConfig;

const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 600;

/// Resolve the Analyzer API key from 3-tier configuration
///
/// Priority: Database → ENV → TOML.
pub async fn resolve_analyzer_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<String> {
    let mut sources = Vec::new();

    let db_key = crate::db::settings::get_analyzer_api_key(db).await?;
    if db_key.as_deref().map(is_valid_key).unwrap_or(false) {
        sources.push("database");
    }

    let env_key = std::env::var("PERSONA_ANALYZER_API_KEY").ok();
    if env_key.as_deref().map(is_valid_key).unwrap_or(false) {
        sources.push("environment");
    }

    let toml_key = toml_config.analyzer_api_key.clone();
    if toml_key.as_deref().map(is_valid_key).unwrap_or(false) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Analyzer API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    for (key, source) in [
        (db_key, "database"),
        (env_key, "environment variable"),
        (toml_key, "TOML config"),
    ] {
        if let Some(key) = key {
            if is_valid_key(&key) {
                info!("Analyzer API key loaded from {}", source);
                return Ok(key);
            }
        }
    }

    Err(Error::Config(
        "Analyzer API key not configured. Please configure using one of:\n\
         1. Database: settings key 'analyzer_api_key'\n\
         2. Environment: PERSONA_ANALYZER_API_KEY=your-key-here\n\
         3. TOML config: persona-ae.toml (analyzer_api_key = \"your-key\")"
            .to_string(),
    ))
}

/// Resolve the full Analyzer client configuration
pub async fn resolve_analyzer_config(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<AnalyzerConfig> {
    let api_key = resolve_analyzer_api_key(db, toml_config).await?;

    let base_url = std::env::var("PERSONA_ANALYZER_BASE_URL")
        .ok()
        .filter(|v| is_valid_key(v))
        .or_else(|| toml_config.analyzer_base_url.clone())
        .ok_or_else(|| {
            Error::Config(
                "Analyzer base URL not configured (PERSONA_ANALYZER_BASE_URL or \
                 analyzer_base_url in TOML)"
                    .to_string(),
            )
        })?;

    let workflow_id = std::env::var("PERSONA_ANALYZER_WORKFLOW_ID")
        .ok()
        .filter(|v| is_valid_key(v))
        .or_else(|| toml_config.analyzer_workflow_id.clone())
        .ok_or_else(|| {
            Error::Config(
                "Analyzer workflow id not configured (PERSONA_ANALYZER_WORKFLOW_ID or \
                 analyzer_workflow_id in TOML)"
                    .to_string(),
            )
        })?;

    let timeout_secs = std::env::var("PERSONA_ANALYZER_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .or(toml_config.analyzer_timeout_secs)
        .unwrap_or(DEFAULT_ANALYZER_TIMEOUT_SECS);

    Ok(AnalyzerConfig::new(base_url, api_key, workflow_id)
        .with_timeout(Duration::from_secs(timeout_secs)))
}

/// Validate a key/value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Sync the Analyzer API key into the TOML config file
///
/// Best-effort backup of the authoritative database value: reads the
/// existing file (or starts from defaults), updates the key, writes back.
pub fn sync_analyzer_key_to_toml(key: &str, toml_path: &std::path::Path) -> Result<()> {
    let mut config = persona_common::config::read_toml_config(toml_path)?;
    config.analyzer_api_key = Some(key.to_string());
    persona_common::config::write_toml_config(&config, toml_path)
}
