//! Streaming analysis API handler
//!
//! POST /analysis/{session_id}/stream
//!
//! One long-lived response per request, carrying newline-delimited JSON
//! progress events. The connection closes after the single terminal event.
//! Client disconnect stops delivery only; the job itself runs to its
//! persisted outcome.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::Response,
    routing::post,
    Json, Router,
};
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::analysis::AnalysisRequestBody;

/// POST /analysis/{session_id}/stream
pub async fn stream_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AnalysisRequestBody>,
) -> ApiResult<Response> {
    let user_id = super::caller_id(&headers)?;

    let (handle, mut rx) = state
        .orchestrator
        .request_analysis_streaming(session_id, user_id, body.analysis_type, body.options)
        .await?;

    tracing::info!(
        job_id = %handle.job_id,
        session_id = %session_id,
        "Progress stream opened"
    );

    let body_stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.stage.is_terminal();
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok::<String, Infallible>(format!("{}\n", json)),
                Err(error) => {
                    tracing::warn!(error = %error, "Failed to serialize progress event");
                }
            }
            if terminal {
                break;
            }
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body_stream))
        .map_err(|e| ApiError::Internal(format!("Failed to build stream response: {}", e)))
}

/// Build stream routes
pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/analysis/:session_id/stream", post(stream_analysis))
}
