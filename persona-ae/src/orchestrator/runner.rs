//! Per-job execution
//!
//! A runner drives one job from processing to its terminal state: load the
//! session's answers, validate and map them into the Analyzer request, call
//! the Analyzer under an explicit timeout, and persist the outcome. Every
//! failure path ends in a persisted `failed` state; nothing is thrown back
//! to the caller that triggered the job.

use chrono::{Datelike, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::db;
use crate::mapping::{build_analysis_request, map_response_context, AnalysisRequest};
use crate::models::{AnalysisJob, ErrorDetail, JobStatus};
use crate::services::{AnalyzerApi, AnalyzerError, AnalyzerOutput, AnalyzerProgress, ProgressSink};
use crate::validators::{generate_analytics, ResponseValidator};

use super::progress::{ProgressClamp, ProgressEvent, ProgressStage};

/// Longest summary derived from the report body when the engine sends none
const DERIVED_SUMMARY_MAX_CHARS: usize = 200;

/// Executes jobs against the store and the Analyzer
pub struct JobRunner {
    db: SqlitePool,
    analyzer: Arc<dyn AnalyzerApi>,
    analyzer_timeout: Duration,
    validator: ResponseValidator,
}

impl JobRunner {
    pub fn new(db: SqlitePool, analyzer: Arc<dyn AnalyzerApi>, analyzer_timeout: Duration) -> Self {
        Self {
            db,
            analyzer,
            analyzer_timeout,
            validator: ResponseValidator::new(),
        }
    }

    /// Execute a job to its terminal state (poll model)
    ///
    /// The caller has already persisted the job as `processing`; the final
    /// state is observable only through the store.
    pub async fn execute(&self, job: AnalysisJob) -> AnalysisJob {
        let started = Instant::now();

        tracing::info!(
            job_id = %job.job_id,
            session_id = %job.session_id,
            analysis_type = job.analysis_type.as_str(),
            "Starting analysis job"
        );

        let request = match self.prepare_request(&job).await {
            Ok(request) => request,
            Err(detail) => return self.fail_job(job, detail).await,
        };

        let output = match tokio::time::timeout(
            self.analyzer_timeout,
            self.analyzer.analyze(&request),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => return self.fail_job(job, error_detail(&error)).await,
            Err(_) => return self.fail_job(job, timeout_detail()).await,
        };

        self.complete_job(job, output, started).await
    }

    /// Execute a job while streaming progress events (progress model)
    ///
    /// Emits the ordered event sequence on `tx` and closes it after exactly
    /// one terminal event. Receiver drop cancels delivery only; execution
    /// and persistence continue regardless.
    pub async fn execute_with_progress(
        &self,
        job: AnalysisJob,
        tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> AnalysisJob {
        let started = Instant::now();
        let job_id = job.job_id;

        tracing::info!(
            job_id = %job_id,
            session_id = %job.session_id,
            analysis_type = job.analysis_type.as_str(),
            "Starting analysis job (streaming)"
        );

        let _ = tx.send(ProgressEvent::new(
            ProgressStage::Initializing,
            10,
            "Setting up analysis environment...",
            job_id,
        ));

        let request = match self.prepare_request(&job).await {
            Ok(request) => request,
            Err(detail) => {
                // Persist failure before the terminal event so a concurrent
                // poller never observes a live job after the error
                let job = self.fail_job(job, detail.clone()).await;
                let _ = tx.send(ProgressEvent::new(
                    ProgressStage::Error,
                    0,
                    detail.message,
                    job_id,
                ));
                return job;
            }
        };

        let _ = tx.send(ProgressEvent::new(
            ProgressStage::Processing,
            30,
            "Analyzing your responses through our AI engine...",
            job_id,
        ));

        let clamp = Arc::new(Mutex::new(ProgressClamp::new(30, 90)));
        let progress_tx = tx.clone();
        let sink: ProgressSink = Box::new(move |update: AnalyzerProgress| {
            let progress = match clamp.lock() {
                Ok(mut clamp) => clamp.clamp(update.progress),
                Err(_) => return,
            };
            let _ = progress_tx.send(ProgressEvent::new(
                ProgressStage::Processing,
                progress,
                update.message,
                job_id,
            ));
        });

        let result = tokio::time::timeout(
            self.analyzer_timeout,
            self.analyzer.analyze_with_progress(&request, sink),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                let detail = error_detail(&error);
                let job = self.fail_job(job, detail.clone()).await;
                let _ = tx.send(ProgressEvent::new(
                    ProgressStage::Error,
                    0,
                    detail.message,
                    job_id,
                ));
                return job;
            }
            Err(_) => {
                let detail = timeout_detail();
                let job = self.fail_job(job, detail.clone()).await;
                let _ = tx.send(ProgressEvent::new(
                    ProgressStage::Error,
                    0,
                    detail.message,
                    job_id,
                ));
                return job;
            }
        };

        let _ = tx.send(ProgressEvent::new(
            ProgressStage::Finalizing,
            90,
            "Preparing your analysis report...",
            job_id,
        ));

        let job = self.complete_job(job, output, started).await;

        match job.status {
            JobStatus::Completed => {
                let _ = tx.send(
                    ProgressEvent::new(
                        ProgressStage::Completed,
                        100,
                        "Analysis complete! Your report is ready.",
                        job_id,
                    )
                    .with_result(json!({
                        "job_id": job.job_id,
                        "status": job.status,
                        "summary": job.summary,
                        "content": job.content,
                    })),
                );
            }
            _ => {
                // Completion persistence failed; the terminal event must
                // reflect the stored state
                let message = job
                    .error_detail
                    .as_ref()
                    .map(|d| d.message.clone())
                    .unwrap_or_else(|| "Analysis failed".to_string());
                let _ = tx.send(ProgressEvent::new(ProgressStage::Error, 0, message, job_id));
            }
        }

        job
    }

    /// Load, validate, and map everything the Analyzer request needs
    async fn prepare_request(&self, job: &AnalysisJob) -> Result<AnalysisRequest, ErrorDetail> {
        let user = db::sessions::get_user(&self.db, job.user_id)
            .await
            .map_err(persistence_detail)?
            .ok_or_else(|| mapping_detail(format!("User profile not found: {}", job.user_id)))?;

        let answers = db::sessions::get_answers(&self.db, job.session_id)
            .await
            .map_err(persistence_detail)?;

        if answers.is_empty() {
            return Err(mapping_detail("Session has no answers to analyze"));
        }

        let mut responses = Vec::with_capacity(answers.len());
        for answer in &answers {
            let question = db::sessions::get_question(&self.db, answer.question_id)
                .await
                .map_err(persistence_detail)?
                .ok_or_else(|| {
                    mapping_detail(format!(
                        "Answer references unknown question: {}",
                        answer.question_id
                    ))
                })?;

            let report = self.validator.validate(&question, Some(&answer.value));
            let analytics =
                generate_analytics(&answer.value, answer.time_spent_seconds, answer.revision_count);
            responses.push(map_response_context(&question, answer, &report, &analytics));
        }

        build_analysis_request(
            &user,
            job.session_id,
            responses,
            job.analysis_type,
            job.options.clone(),
            Utc::now().year(),
        )
        .map_err(|e| mapping_detail(e.to_string()))
    }

    /// Persist the completed terminal state
    async fn complete_job(
        &self,
        mut job: AnalysisJob,
        output: AnalyzerOutput,
        started: Instant,
    ) -> AnalysisJob {
        let summary = output
            .summary
            .clone()
            .unwrap_or_else(|| derive_summary(&output.text));

        job.content = Some(json!({
            "text": output.text,
            "format": "markdown",
            "generated_at": Utc::now().to_rfc3339(),
        }));
        job.summary = Some(summary);
        job.processing_ms = Some(started.elapsed().as_millis() as i64);
        job.transition_to(JobStatus::Completed);

        if let Err(error) = db::jobs::save_job(&self.db, &job).await {
            tracing::error!(
                job_id = %job.job_id,
                error = %error,
                "Failed to persist completed job, marking failed"
            );
            return self
                .fail_job(job, persistence_detail(error))
                .await;
        }

        tracing::info!(
            job_id = %job.job_id,
            session_id = %job.session_id,
            processing_ms = job.processing_ms,
            "Analysis job completed"
        );

        job
    }

    /// Persist the failed terminal state
    ///
    /// A store write failure here is logged and nothing else; the job object
    /// still reflects the failure for in-process observers.
    async fn fail_job(&self, mut job: AnalysisJob, detail: ErrorDetail) -> AnalysisJob {
        tracing::warn!(
            job_id = %job.job_id,
            session_id = %job.session_id,
            kind = %detail.kind,
            error = %detail.message,
            "Analysis job failed"
        );

        job.content = None;
        job.summary = None;
        job.error_detail = Some(detail);
        job.transition_to(JobStatus::Failed);

        if let Err(error) = db::jobs::save_job(&self.db, &job).await {
            tracing::error!(
                job_id = %job.job_id,
                error = %error,
                "Failed to persist failed job state"
            );
        }

        job
    }
}

fn error_detail(error: &AnalyzerError) -> ErrorDetail {
    ErrorDetail {
        kind: error.kind_str().to_string(),
        message: error.to_string(),
    }
}

fn timeout_detail() -> ErrorDetail {
    ErrorDetail {
        kind: AnalyzerError::Timeout.kind_str().to_string(),
        message: "Analyzer call exceeded the configured timeout".to_string(),
    }
}

fn mapping_detail(message: impl Into<String>) -> ErrorDetail {
    ErrorDetail {
        kind: "mapping".to_string(),
        message: message.into(),
    }
}

fn persistence_detail(error: persona_common::Error) -> ErrorDetail {
    ErrorDetail {
        kind: "persistence".to_string(),
        message: error.to_string(),
    }
}

/// First meaningful line of the report, stripped of markdown heading marks
fn derive_summary(text: &str) -> String {
    let line = text
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())
        .unwrap_or("Analysis completed successfully");

    if line.chars().count() > DERIVED_SUMMARY_MAX_CHARS {
        line.chars().take(DERIVED_SUMMARY_MAX_CHARS).collect()
    } else {
        line.to_string()
    }
}
