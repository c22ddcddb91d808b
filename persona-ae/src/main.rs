//! persona-ae - Analysis Engine Microservice
//!
//! Turns completed questionnaire sessions into AI-generated analysis
//! reports. Owns the analysis job lifecycle; the questionnaire UI and the
//! AI workflow engine are external collaborators.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use persona_ae::services::HttpAnalyzerClient;
use persona_ae::{AnalysisOrchestrator, AppState, OrchestratorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Step 1: Load TOML config (lowest tier)
    let config_path = std::env::var("PERSONA_AE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("persona-ae.toml"));
    let toml_config = persona_common::config::read_toml_config(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // Step 2: Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting persona-ae (Analysis Engine) microservice");
    info!("Port: 5810");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 3: Open or create database
    let db_path = std::env::var("PERSONA_AE_DATABASE")
        .ok()
        .or_else(|| toml_config.database_path.clone())
        .unwrap_or_else(|| "persona-ae.db".to_string());
    info!("Database: {}", db_path);

    let db_pool = persona_ae::db::init_database_pool(std::path::Path::new(&db_path)).await?;
    info!("Database connection established");

    // Step 4: Sweep jobs stranded by a previous run
    let orphaned = persona_ae::db::jobs::fail_orphaned_jobs(&db_pool).await?;
    if orphaned > 0 {
        info!(orphaned, "Marked stranded analysis jobs as failed");
    }

    // Step 5: Resolve Analyzer configuration (Database → ENV → TOML)
    let analyzer_config = persona_ae::config::resolve_analyzer_config(&db_pool, &toml_config)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let analyzer = Arc::new(
        HttpAnalyzerClient::new(analyzer_config)
            .map_err(|e| anyhow::anyhow!("Analyzer client init failed: {}", e))?,
    );
    info!("Analyzer client initialized");

    // Step 6: Start the orchestrator and its worker pool
    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        db_pool.clone(),
        analyzer,
        OrchestratorConfig::default(),
    ));

    let state = AppState::new(db_pool, orchestrator);
    let app = persona_ae::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5810").await?;
    info!("Listening on http://127.0.0.1:5810");
    info!("Health check: http://127.0.0.1:5810/health");

    axum::serve(listener, app).await?;

    Ok(())
}
