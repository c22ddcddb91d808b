//! HTTP API handlers
//!
//! Thin adapters over the orchestrator: caller identification, request
//! shape, response shape. Domain decisions live in the orchestrator.

mod analysis;
mod batch;
mod health;
mod jobs;
mod settings;
mod stream;

pub use analysis::analysis_routes;
pub use batch::batch_routes;
pub use health::health_routes;
pub use jobs::job_routes;
pub use settings::settings_routes;
pub use stream::stream_routes;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Identify the caller from the X-User-Id header
///
/// Authentication itself is an external concern; upstream middleware is
/// trusted to have verified the identity this header carries.
pub(crate) fn caller_id(headers: &HeaderMap) -> ApiResult<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing or invalid X-User-Id header".to_string()))
}
