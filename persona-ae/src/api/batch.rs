//! Batch analysis API handler
//!
//! POST /analysis/batch

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{AnalysisOptions, AnalysisType};
use crate::orchestrator::{BatchItemError, BatchItemResult};
use crate::AppState;

/// POST /analysis/batch request
#[derive(Debug, Deserialize)]
pub struct BatchRequestBody {
    pub session_ids: Vec<Uuid>,
    #[serde(default = "default_analysis_type")]
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub options: AnalysisOptions,
}

fn default_analysis_type() -> AnalysisType {
    AnalysisType::Comprehensive
}

/// POST /analysis/batch response
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub message: String,
    pub summary: BatchSummary,
    pub results: Vec<BatchItemResult>,
    pub errors: Vec<BatchItemError>,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub cached: usize,
    pub failed: usize,
}

/// POST /analysis/batch
///
/// Run analysis for multiple sessions with per-session failure isolation.
/// The call returns once every item has reached a terminal outcome.
pub async fn run_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BatchRequestBody>,
) -> ApiResult<Json<BatchResponse>> {
    let user_id = super::caller_id(&headers)?;

    let outcome = state
        .orchestrator
        .run_batch(&body.session_ids, user_id, body.analysis_type, body.options)
        .await?;

    Ok(Json(BatchResponse {
        message: "Batch analysis completed".to_string(),
        summary: BatchSummary {
            total: outcome.total,
            completed: outcome.completed,
            cached: outcome.cached,
            failed: outcome.failed,
        },
        results: outcome.results,
        errors: outcome.errors,
    }))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new().route("/analysis/batch", post(run_batch))
}
