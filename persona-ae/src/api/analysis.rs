//! Analysis request API handlers
//!
//! POST /analysis/{session_id}, GET /analysis/{session_id}

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{AnalysisJob, AnalysisOptions, AnalysisType};
use crate::orchestrator::JobHandle;
use crate::AppState;

/// POST /analysis/{session_id} request
#[derive(Debug, Deserialize)]
pub struct AnalysisRequestBody {
    #[serde(default = "default_analysis_type")]
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub options: AnalysisOptions,
}

fn default_analysis_type() -> AnalysisType {
    AnalysisType::Comprehensive
}

/// POST /analysis/{session_id} response
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub message: String,
    #[serde(flatten)]
    pub handle: JobHandle,
}

/// GET /analysis/{session_id} query
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub analysis_type: Option<AnalysisType>,
}

/// GET /analysis/{session_id} response
#[derive(Debug, Serialize)]
pub struct SessionJobsResponse {
    pub jobs: Vec<AnalysisJob>,
    /// Most recent job of the requested type
    pub current: Option<AnalysisJob>,
    pub available: bool,
}

/// POST /analysis/{session_id}
///
/// Request analysis; returns the job handle immediately. Completion is
/// observed through polling.
pub async fn request_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AnalysisRequestBody>,
) -> ApiResult<Json<AnalysisResponse>> {
    let user_id = super::caller_id(&headers)?;

    let handle = state
        .orchestrator
        .request_analysis(session_id, user_id, body.analysis_type, body.options)
        .await?;

    let message = if handle.cached {
        "Analysis already exists".to_string()
    } else {
        "Analysis started".to_string()
    };

    Ok(Json(AnalysisResponse { message, handle }))
}

/// GET /analysis/{session_id}
///
/// List this session's analysis jobs, optionally narrowed by type.
pub async fn list_session_analyses(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionJobsResponse>> {
    let user_id = super::caller_id(&headers)?;

    let jobs = state
        .orchestrator
        .list_session_jobs(session_id, user_id)
        .await?;

    let requested_type = query.analysis_type.unwrap_or(AnalysisType::Comprehensive);
    let current = jobs
        .iter()
        .filter(|job| job.analysis_type == requested_type)
        .max_by_key(|job| job.created_at)
        .cloned();

    Ok(Json(SessionJobsResponse {
        available: current.is_some(),
        current,
        jobs,
    }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis/:session_id", post(request_analysis))
        .route("/analysis/:session_id", get(list_session_analyses))
}
