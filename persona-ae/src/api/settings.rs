//! Settings API endpoint
//!
//! POST /settings/analyzer_api_key: operator path for populating the
//! database tier of the Analyzer configuration. The database is the
//! authoritative tier; the key takes effect at the next configuration
//! resolution (service restart).

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Request payload for setting the Analyzer API key
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Response payload for API key configuration
#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /settings/analyzer_api_key
///
/// Validates the key, writes it to the database (authoritative), then
/// syncs it to the TOML config as a best-effort backup. A TOML failure
/// logs a warning but does not fail the request.
pub async fn set_analyzer_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    crate::db::settings::set_analyzer_api_key(&state.db, payload.api_key.clone()).await?;

    info!("Analyzer API key configured via settings API");

    // TOML backup only when a config file path is configured
    match std::env::var("PERSONA_AE_CONFIG") {
        Ok(path) => {
            let path = std::path::PathBuf::from(path);
            match crate::config::sync_analyzer_key_to_toml(&payload.api_key, &path) {
                Ok(()) => info!("Analyzer API key synced to TOML: {}", path.display()),
                Err(e) => warn!("TOML sync failed (database write succeeded): {}", e),
            }
        }
        Err(_) => {
            debug!("PERSONA_AE_CONFIG not set, skipping TOML sync");
        }
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Analyzer API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings/analyzer_api_key", post(set_analyzer_api_key))
}
