//! Job status and retry API handlers
//!
//! GET /jobs/{job_id}, POST /jobs/{job_id}/retry

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::AnalysisJob;
use crate::orchestrator::JobHandle;
use crate::AppState;

/// POST /jobs/{job_id}/retry response
#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub message: String,
    #[serde(flatten)]
    pub handle: JobHandle,
}

/// GET /jobs/{job_id}
///
/// Poll job status. Pure read; never re-invokes the Analyzer.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<AnalysisJob>> {
    let user_id = super::caller_id(&headers)?;
    let job = state.orchestrator.get_status(job_id, user_id).await?;
    Ok(Json(job))
}

/// POST /jobs/{job_id}/retry
///
/// Explicit retry; legal only for failed jobs.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<RetryResponse>> {
    let user_id = super::caller_id(&headers)?;
    let handle = state.orchestrator.retry(job_id, user_id).await?;

    Ok(Json(RetryResponse {
        message: "Analysis retry started".to_string(),
        handle,
    }))
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/:job_id", get(get_job_status))
        .route("/jobs/:job_id/retry", post(retry_job))
}
