//! Analysis job orchestration
//!
//! Owns the job state machine: request intake with ownership and
//! idempotency checks, detached execution through the bounded worker pool,
//! streaming execution on dedicated tasks, status reads, explicit retry,
//! and batch fan-out with per-item failure isolation.

mod executor;
pub mod progress;
mod runner;

pub use executor::{JobExecutor, JobTask};
pub use progress::{ProgressEvent, ProgressStage};
pub use runner::JobRunner;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AnalysisJob, AnalysisOptions, AnalysisType, JobStatus, QuestionnaireSession, SessionStatus,
};
use crate::services::AnalyzerApi;

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bounded queue capacity for detached execution
    pub queue_capacity: usize,
    /// Worker task count
    pub workers: usize,
    /// Analyzer call deadline
    pub analyzer_timeout: Duration,
    /// Upper bound on batch size
    pub max_batch_sessions: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            workers: 4,
            analyzer_timeout: Duration::from_secs(600),
            max_batch_sessions: 10,
        }
    }
}

/// Synchronous acknowledgment returned by request/retry operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub analysis_type: AnalysisType,
    pub status: JobStatus,
    /// True when an existing completed job was returned instead of new work
    pub cached: bool,
    pub title: String,
}

impl JobHandle {
    fn from_job(job: &AnalysisJob, cached: bool) -> Self {
        Self {
            job_id: job.job_id,
            session_id: job.session_id,
            analysis_type: job.analysis_type,
            status: job.status,
            cached,
            title: job.title.clone(),
        }
    }
}

/// Per-session outcome within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub status: JobStatus,
    pub cached: bool,
}

/// Per-session failure within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemError {
    pub session_id: Uuid,
    pub error: String,
}

/// Aggregated batch outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub completed: usize,
    pub cached: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
    pub errors: Vec<BatchItemError>,
}

/// Outcome of the create-or-reuse step
enum PreparedJob {
    /// Completed job exists; return it, start nothing
    Cached(AnalysisJob),
    /// A live job already exists for the pair; observe it
    InFlight(AnalysisJob),
    /// Fresh or reset job in Queued state, ready to execute
    Ready(AnalysisJob),
}

/// The Analysis Job Orchestrator
pub struct AnalysisOrchestrator {
    db: SqlitePool,
    runner: Arc<JobRunner>,
    executor: JobExecutor,
    max_batch_sessions: usize,
}

impl AnalysisOrchestrator {
    pub fn new(db: SqlitePool, analyzer: Arc<dyn AnalyzerApi>, config: OrchestratorConfig) -> Self {
        let runner = Arc::new(JobRunner::new(
            db.clone(),
            analyzer,
            config.analyzer_timeout,
        ));
        let executor = JobExecutor::start(runner.clone(), config.queue_capacity, config.workers);

        Self {
            db,
            runner,
            executor,
            max_batch_sessions: config.max_batch_sessions,
        }
    }

    /// Request analysis for a session (poll model)
    ///
    /// Returns synchronously as soon as the job is durably recorded; the
    /// caller observes completion through `get_status`.
    pub async fn request_analysis(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
    ) -> ApiResult<JobHandle> {
        self.authorize_completed_session(session_id, user_id).await?;

        match self.prepare_job(session_id, user_id, analysis_type, options).await? {
            PreparedJob::Cached(job) => {
                tracing::info!(
                    job_id = %job.job_id,
                    session_id = %session_id,
                    "Returning cached completed analysis"
                );
                Ok(JobHandle::from_job(&job, true))
            }
            PreparedJob::InFlight(job) => Ok(JobHandle::from_job(&job, false)),
            PreparedJob::Ready(job) => self.dispatch(job).await,
        }
    }

    /// Request analysis with streamed progress (progress model)
    ///
    /// Returns the handle plus the event receiver. For an already-completed
    /// pair the stream carries a single `completed` event.
    pub async fn request_analysis_streaming(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
    ) -> ApiResult<(JobHandle, mpsc::UnboundedReceiver<ProgressEvent>)> {
        self.authorize_completed_session(session_id, user_id).await?;

        let (tx, rx) = mpsc::unbounded_channel();

        match self.prepare_job(session_id, user_id, analysis_type, options).await? {
            PreparedJob::Cached(job) => {
                let event = ProgressEvent::new(
                    ProgressStage::Completed,
                    100,
                    "Analysis complete! Your report is ready.",
                    job.job_id,
                )
                .with_result(serde_json::json!({
                    "job_id": job.job_id,
                    "status": job.status,
                    "summary": job.summary,
                    "content": job.content,
                }));
                let _ = tx.send(event);
                Ok((JobHandle::from_job(&job, true), rx))
            }
            PreparedJob::InFlight(job) => Err(ApiError::Conflict(format!(
                "Analysis already in progress for this session (job {})",
                job.job_id
            ))),
            PreparedJob::Ready(mut job) => {
                job.transition_to(JobStatus::Processing);
                db::jobs::save_job(&self.db, &job).await?;

                let handle = JobHandle::from_job(&job, false);
                let runner = self.runner.clone();
                // Dedicated task per stream; the worker pool is for the
                // poll model only
                tokio::spawn(async move {
                    runner.execute_with_progress(job, tx).await;
                });

                Ok((handle, rx))
            }
        }
    }

    /// Pure status read
    pub async fn get_status(&self, job_id: Uuid, user_id: Uuid) -> ApiResult<AnalysisJob> {
        let job = db::jobs::load_job(&self.db, job_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Analysis job not found: {}", job_id)))?;

        if job.user_id != user_id {
            return Err(ApiError::Unauthorized(
                "Analysis job is not owned by the caller".to_string(),
            ));
        }

        Ok(job)
    }

    /// List all jobs for one owned session
    pub async fn list_session_jobs(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> ApiResult<Vec<AnalysisJob>> {
        let session = db::sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

        if session.user_id != user_id {
            return Err(ApiError::Unauthorized(
                "Session is not owned by the caller".to_string(),
            ));
        }

        Ok(db::jobs::list_by_session(&self.db, session_id, user_id).await?)
    }

    /// Explicit retry of a failed job
    ///
    /// Legal only from the `failed` state; resets the job to `queued` and
    /// re-executes with its original options.
    pub async fn retry(&self, job_id: Uuid, user_id: Uuid) -> ApiResult<JobHandle> {
        let job = self.get_status(job_id, user_id).await?;

        if !db::jobs::reset_failed_job(&self.db, job.job_id, &job.options).await? {
            return Err(ApiError::BadRequest(format!(
                "Only failed jobs can be retried (job {} is {})",
                job.job_id,
                job.status.as_str()
            )));
        }

        // The CAS already moved the row back to queued
        let job = db::jobs::load_job(&self.db, job_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Analysis job not found: {}", job_id)))?;

        tracing::info!(job_id = %job.job_id, session_id = %job.session_id, "Retrying failed analysis job");

        self.dispatch(job).await
    }

    /// Batch execution over multiple sessions
    ///
    /// Bounded; each session is processed independently and one failure
    /// never aborts the rest. Items run to their terminal state within this
    /// call.
    pub async fn run_batch(
        &self,
        session_ids: &[Uuid],
        user_id: Uuid,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
    ) -> ApiResult<BatchOutcome> {
        if session_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "Batch requires at least one session".to_string(),
            ));
        }
        if session_ids.len() > self.max_batch_sessions {
            return Err(ApiError::BadRequest(format!(
                "Batch size {} exceeds the maximum of {}",
                session_ids.len(),
                self.max_batch_sessions
            )));
        }

        let mut outcome = BatchOutcome {
            total: session_ids.len(),
            completed: 0,
            cached: 0,
            failed: 0,
            results: Vec::new(),
            errors: Vec::new(),
        };

        for &session_id in session_ids {
            match self
                .run_batch_item(session_id, user_id, analysis_type, options.clone())
                .await
            {
                Ok(result) => {
                    match (result.cached, result.status) {
                        (true, _) => outcome.cached += 1,
                        (false, JobStatus::Completed) => outcome.completed += 1,
                        _ => outcome.failed += 1,
                    }
                    if !result.cached && result.status == JobStatus::Failed {
                        outcome.errors.push(BatchItemError {
                            session_id,
                            error: "Analysis failed; see job error detail".to_string(),
                        });
                    }
                    outcome.results.push(result);
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %error,
                        "Batch item rejected"
                    );
                    outcome.failed += 1;
                    outcome.errors.push(BatchItemError {
                        session_id,
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            total = outcome.total,
            completed = outcome.completed,
            cached = outcome.cached,
            failed = outcome.failed,
            "Batch analysis finished"
        );

        Ok(outcome)
    }

    /// One batch item: checks, create-or-reuse, inline execution
    async fn run_batch_item(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
    ) -> ApiResult<BatchItemResult> {
        self.authorize_completed_session(session_id, user_id).await?;

        match self.prepare_job(session_id, user_id, analysis_type, options).await? {
            PreparedJob::Cached(job) => Ok(BatchItemResult {
                session_id,
                job_id: job.job_id,
                status: job.status,
                cached: true,
            }),
            PreparedJob::InFlight(job) => Err(ApiError::Conflict(format!(
                "Analysis already in progress for this session (job {})",
                job.job_id
            ))),
            PreparedJob::Ready(mut job) => {
                job.transition_to(JobStatus::Processing);
                db::jobs::save_job(&self.db, &job).await?;

                let job = self.runner.execute(job).await;
                Ok(BatchItemResult {
                    session_id,
                    job_id: job.job_id,
                    status: job.status,
                    cached: false,
                })
            }
        }
    }

    /// Ownership and completion gate shared by all entry points
    async fn authorize_completed_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> ApiResult<QuestionnaireSession> {
        let session = db::sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

        if session.user_id != user_id {
            return Err(ApiError::Unauthorized(
                "Session is not owned by the caller".to_string(),
            ));
        }

        if session.status != SessionStatus::Completed {
            return Err(ApiError::BadRequest(format!(
                "Session is not completed (status: {})",
                session.status.as_str()
            )));
        }

        Ok(session)
    }

    /// Create a fresh job or reuse the existing row for the pair
    async fn prepare_job(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
    ) -> ApiResult<PreparedJob> {
        if let Some(existing) =
            db::jobs::get_by_session_and_type(&self.db, session_id, analysis_type).await?
        {
            return match existing.status {
                JobStatus::Completed => Ok(PreparedJob::Cached(existing)),
                JobStatus::Queued | JobStatus::Processing => Ok(PreparedJob::InFlight(existing)),
                JobStatus::Failed => {
                    // CAS re-entry; losing the race means another request
                    // already revived the job
                    if db::jobs::reset_failed_job(&self.db, existing.job_id, &options).await? {
                        let job = db::jobs::load_job(&self.db, existing.job_id).await?.ok_or_else(
                            || {
                                ApiError::Internal(format!(
                                    "Job vanished during retry: {}",
                                    existing.job_id
                                ))
                            },
                        )?;
                        Ok(PreparedJob::Ready(job))
                    } else {
                        let job = db::jobs::load_job(&self.db, existing.job_id).await?.ok_or_else(
                            || {
                                ApiError::Internal(format!(
                                    "Job vanished during retry: {}",
                                    existing.job_id
                                ))
                            },
                        )?;
                        Ok(PreparedJob::InFlight(job))
                    }
                }
            };
        }

        let first_name = db::sessions::get_user(&self.db, user_id)
            .await?
            .and_then(|user| user.first_name);
        let title = analysis_type.report_title(first_name.as_deref());
        let job = AnalysisJob::new(session_id, user_id, analysis_type, title, options);

        if db::jobs::try_create_job(&self.db, &job).await? {
            tracing::info!(
                job_id = %job.job_id,
                session_id = %session_id,
                analysis_type = analysis_type.as_str(),
                "Created analysis job"
            );
            return Ok(PreparedJob::Ready(job));
        }

        // Lost the create race; the winner's row is authoritative
        let existing = db::jobs::get_by_session_and_type(&self.db, session_id, analysis_type)
            .await?
            .ok_or_else(|| {
                ApiError::Internal("Job creation conflicted but no job exists".to_string())
            })?;

        match existing.status {
            JobStatus::Completed => Ok(PreparedJob::Cached(existing)),
            _ => Ok(PreparedJob::InFlight(existing)),
        }
    }

    /// Persist the processing transition and hand the job to the pool
    async fn dispatch(&self, mut job: AnalysisJob) -> ApiResult<JobHandle> {
        job.transition_to(JobStatus::Processing);
        db::jobs::save_job(&self.db, &job).await?;

        let handle = JobHandle::from_job(&job, false);

        if let Err(task) = self.executor.try_submit(JobTask { job }) {
            let mut job = task.job;
            tracing::error!(
                job_id = %job.job_id,
                "Analysis queue is full, rejecting job"
            );

            job.error_detail = Some(crate::models::ErrorDetail {
                kind: "queue_full".to_string(),
                message: "Analysis queue is full".to_string(),
            });
            job.transition_to(JobStatus::Failed);
            db::jobs::save_job(&self.db, &job).await?;

            return Err(ApiError::Conflict(
                "Analysis queue is full, try again later".to_string(),
            ));
        }

        Ok(handle)
    }
}
