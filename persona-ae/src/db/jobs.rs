//! Analysis job store
//!
//! The job record for a given job_id is mutated only by the orchestrator
//! that owns its lifecycle. Creation uses INSERT ... ON CONFLICT DO NOTHING
//! against the partial unique index, so two concurrent first-time requests
//! for the same (session, type) collapse onto one row.

use persona_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{AnalysisJob, AnalysisOptions, AnalysisType, ErrorDetail, JobStatus};

/// Attempt to insert a new job row
///
/// Returns false when the partial unique index rejected the insert (a
/// non-failed job already exists for the pair); the caller then re-reads
/// the existing row.
pub async fn try_create_job(pool: &SqlitePool, job: &AnalysisJob) -> Result<bool> {
    let content = job
        .content
        .as_ref()
        .map(|c| serde_json::to_string(c))
        .transpose()
        .map_err(|e| Error::Encode(format!("content: {}", e)))?;
    let options = serde_json::to_string(&job.options)
        .map_err(|e| Error::Encode(format!("options: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO analysis_jobs (
            job_id, session_id, user_id, analysis_type, status, title,
            options, content, summary, error_kind, error_message,
            processing_ms, created_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(job.job_id.to_string())
    .bind(job.session_id.to_string())
    .bind(job.user_id.to_string())
    .bind(job.analysis_type.as_str())
    .bind(job.status.as_str())
    .bind(&job.title)
    .bind(options)
    .bind(content)
    .bind(&job.summary)
    .bind(job.error_detail.as_ref().map(|e| e.kind.clone()))
    .bind(job.error_detail.as_ref().map(|e| e.message.clone()))
    .bind(job.processing_ms)
    .bind(job.created_at.to_rfc3339())
    .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist the current state of an existing job (keyed by job_id)
pub async fn save_job(pool: &SqlitePool, job: &AnalysisJob) -> Result<()> {
    let content = job
        .content
        .as_ref()
        .map(|c| serde_json::to_string(c))
        .transpose()
        .map_err(|e| Error::Encode(format!("content: {}", e)))?;
    let options = serde_json::to_string(&job.options)
        .map_err(|e| Error::Encode(format!("options: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = ?,
            title = ?,
            options = ?,
            content = ?,
            summary = ?,
            error_kind = ?,
            error_message = ?,
            processing_ms = ?,
            completed_at = ?
        WHERE job_id = ?
        "#,
    )
    .bind(job.status.as_str())
    .bind(&job.title)
    .bind(options)
    .bind(content)
    .bind(&job.summary)
    .bind(job.error_detail.as_ref().map(|e| e.kind.clone()))
    .bind(job.error_detail.as_ref().map(|e| e.message.clone()))
    .bind(job.processing_ms)
    .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
    .bind(job.job_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a job by id
pub async fn load_job(pool: &SqlitePool, job_id: Uuid) -> Result<Option<AnalysisJob>> {
    let row = sqlx::query(
        r#"
        SELECT job_id, session_id, user_id, analysis_type, status, title,
               options, content, summary, error_kind, error_message,
               processing_ms, created_at, completed_at
        FROM analysis_jobs
        WHERE job_id = ?
        "#,
    )
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(job_from_row).transpose()
}

/// Load the authoritative job for a (session, type) pair
///
/// Prefers the non-failed row (at most one exists); falls back to the most
/// recent failed attempt so it can be reused on re-request.
pub async fn get_by_session_and_type(
    pool: &SqlitePool,
    session_id: Uuid,
    analysis_type: AnalysisType,
) -> Result<Option<AnalysisJob>> {
    let row = sqlx::query(
        r#"
        SELECT job_id, session_id, user_id, analysis_type, status, title,
               options, content, summary, error_kind, error_message,
               processing_ms, created_at, completed_at
        FROM analysis_jobs
        WHERE session_id = ? AND analysis_type = ?
        ORDER BY CASE WHEN status != 'failed' THEN 0 ELSE 1 END, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(session_id.to_string())
    .bind(analysis_type.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(job_from_row).transpose()
}

/// List all jobs for one session owned by one user
pub async fn list_by_session(
    pool: &SqlitePool,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<AnalysisJob>> {
    let rows = sqlx::query(
        r#"
        SELECT job_id, session_id, user_id, analysis_type, status, title,
               options, content, summary, error_kind, error_message,
               processing_ms, created_at, completed_at
        FROM analysis_jobs
        WHERE session_id = ? AND user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(session_id.to_string())
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(job_from_row).collect()
}

/// List all jobs for a set of sessions
pub async fn list_by_session_ids(
    pool: &SqlitePool,
    session_ids: &[Uuid],
) -> Result<Vec<AnalysisJob>> {
    if session_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; session_ids.len()].join(", ");
    let sql = format!(
        r#"
        SELECT job_id, session_id, user_id, analysis_type, status, title,
               options, content, summary, error_kind, error_message,
               processing_ms, created_at, completed_at
        FROM analysis_jobs
        WHERE session_id IN ({})
        ORDER BY created_at DESC
        "#,
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for session_id in session_ids {
        query = query.bind(session_id.to_string());
    }

    let rows = query.fetch_all(pool).await?;
    rows.into_iter().map(job_from_row).collect()
}

/// Reset a failed job back to queued (compare-and-set)
///
/// The WHERE clause doubles as the state-machine precondition: only a
/// failed job can re-enter the queue, and of two racing retries exactly one
/// observes rows_affected == 1.
pub async fn reset_failed_job(
    pool: &SqlitePool,
    job_id: Uuid,
    options: &AnalysisOptions,
) -> Result<bool> {
    let options = serde_json::to_string(options)
        .map_err(|e| Error::Encode(format!("options: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'queued',
            options = ?,
            content = NULL,
            summary = NULL,
            error_kind = NULL,
            error_message = NULL,
            processing_ms = NULL,
            completed_at = NULL
        WHERE job_id = ? AND status = 'failed'
        "#,
    )
    .bind(options)
    .bind(job_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fail jobs stranded in a non-terminal state by a previous run
///
/// Any queued/processing job at service start belongs to a worker that no
/// longer exists and would otherwise sit in `processing` forever.
pub async fn fail_orphaned_jobs(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'failed',
            error_kind = 'orphaned',
            error_message = 'Job abandoned by a previous service run',
            completed_at = ?
        WHERE status IN ('queued', 'processing')
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

fn job_from_row(row: sqlx::sqlite::SqliteRow) -> Result<AnalysisJob> {
    let job_id: String = row.get("job_id");
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|e| Error::CorruptRecord(format!("job_id: {}", e)))?;

    let session_id: String = row.get("session_id");
    let session_id = Uuid::parse_str(&session_id)
        .map_err(|e| Error::CorruptRecord(format!("session_id: {}", e)))?;

    let user_id: String = row.get("user_id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::CorruptRecord(format!("user_id: {}", e)))?;

    let analysis_type: String = row.get("analysis_type");
    let analysis_type = AnalysisType::parse(&analysis_type)
        .ok_or_else(|| Error::CorruptRecord(format!("unknown analysis_type: {}", analysis_type)))?;

    let status: String = row.get("status");
    let status = JobStatus::parse(&status)
        .ok_or_else(|| Error::CorruptRecord(format!("unknown job status: {}", status)))?;

    let options: String = row.get("options");
    let options: AnalysisOptions = serde_json::from_str(&options)
        .map_err(|e| Error::CorruptRecord(format!("options: {}", e)))?;

    let content: Option<String> = row.get("content");
    let content = content
        .map(|c| serde_json::from_str(&c))
        .transpose()
        .map_err(|e| Error::CorruptRecord(format!("content: {}", e)))?;

    let error_kind: Option<String> = row.get("error_kind");
    let error_message: Option<String> = row.get("error_message");
    let error_detail = match (error_kind, error_message) {
        (Some(kind), Some(message)) => Some(ErrorDetail { kind, message }),
        (Some(kind), None) => Some(ErrorDetail {
            kind,
            message: String::new(),
        }),
        _ => None,
    };

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::CorruptRecord(format!("created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::CorruptRecord(format!("completed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    Ok(AnalysisJob {
        job_id,
        session_id,
        user_id,
        analysis_type,
        status,
        title: row.get("title"),
        options,
        content,
        summary: row.get("summary"),
        error_detail,
        processing_ms: row.get("processing_ms"),
        created_at,
        completed_at,
    })
}
