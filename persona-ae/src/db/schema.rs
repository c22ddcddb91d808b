//! Schema bootstrap
//!
//! Tables are created idempotently at startup. The partial unique index on
//! analysis_jobs enforces at most one non-failed job per
//! (session_id, analysis_type) at the store level, which is what makes
//! concurrent first-time requests collapse onto a single job.

use persona_common::Result;
use sqlx::SqlitePool;

/// Create all tables and indexes if they do not exist
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            graduation_year INTEGER,
            school_name TEXT,
            location TEXT,
            equity_eligible INTEGER NOT NULL DEFAULT 0,
            first_generation INTEGER NOT NULL DEFAULT 0,
            preferences TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questionnaire_sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            questionnaire_id TEXT NOT NULL,
            total_questions INTEGER NOT NULL DEFAULT 0,
            answered_questions INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            question_id TEXT PRIMARY KEY,
            question_text TEXT NOT NULL,
            question_type TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'general',
            constraints TEXT NOT NULL DEFAULT '{}',
            is_required INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answers (
            session_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            value TEXT NOT NULL,
            time_spent_seconds INTEGER NOT NULL DEFAULT 0,
            revision_count INTEGER NOT NULL DEFAULT 0,
            answered_at TEXT NOT NULL,
            PRIMARY KEY (session_id, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_jobs (
            job_id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            analysis_type TEXT NOT NULL,
            status TEXT NOT NULL,
            title TEXT NOT NULL,
            options TEXT NOT NULL DEFAULT '{}',
            content TEXT,
            summary TEXT,
            error_kind TEXT,
            error_message TEXT,
            processing_ms INTEGER,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_active_session_type
        ON analysis_jobs (session_id, analysis_type)
        WHERE status != 'failed'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
