//! persona-ae library interface
//!
//! Exposes the analysis engine's public APIs for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod mapping;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod validators;

pub use crate::error::{ApiError, ApiResult};
pub use crate::orchestrator::{AnalysisOrchestrator, OrchestratorConfig};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Job orchestrator
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self {
            db,
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analysis_routes())
        .merge(api::batch_routes())
        .merge(api::job_routes())
        .merge(api::stream_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
