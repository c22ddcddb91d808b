//! Job store semantics tests
//!
//! The store-level guarantees the orchestrator leans on: at most one
//! non-failed job per (session, type), compare-and-set retry re-entry, and
//! the startup sweep for stranded jobs.

mod common;

use common::test_pool;
use persona_ae::db::jobs;
use persona_ae::models::{AnalysisJob, AnalysisOptions, AnalysisType, ErrorDetail, JobStatus};
use uuid::Uuid;

fn new_job(session_id: Uuid, user_id: Uuid, analysis_type: AnalysisType) -> AnalysisJob {
    AnalysisJob::new(
        session_id,
        user_id,
        analysis_type,
        analysis_type.report_title(Some("Ava")),
        AnalysisOptions::default(),
    )
}

#[tokio::test]
async fn second_insert_for_the_same_pair_is_rejected() {
    let pool = test_pool().await;
    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let first = new_job(session_id, user_id, AnalysisType::Comprehensive);
    assert!(jobs::try_create_job(&pool, &first).await.unwrap());

    let second = new_job(session_id, user_id, AnalysisType::Comprehensive);
    assert!(
        !jobs::try_create_job(&pool, &second).await.unwrap(),
        "partial unique index must reject a second non-failed job"
    );

    // A different analysis type for the same session is an independent pair
    let other_type = new_job(session_id, user_id, AnalysisType::Personality);
    assert!(jobs::try_create_job(&pool, &other_type).await.unwrap());
}

#[tokio::test]
async fn failed_jobs_do_not_block_new_attempts() {
    let pool = test_pool().await;
    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut first = new_job(session_id, user_id, AnalysisType::Comprehensive);
    assert!(jobs::try_create_job(&pool, &first).await.unwrap());

    first.error_detail = Some(ErrorDetail {
        kind: "gateway".to_string(),
        message: "upstream unavailable".to_string(),
    });
    first.transition_to(JobStatus::Failed);
    jobs::save_job(&pool, &first).await.unwrap();

    let replacement = new_job(session_id, user_id, AnalysisType::Comprehensive);
    assert!(
        jobs::try_create_job(&pool, &replacement).await.unwrap(),
        "failed rows are outside the uniqueness constraint"
    );

    // The non-failed row is the authoritative one for the pair
    let found = jobs::get_by_session_and_type(&pool, session_id, AnalysisType::Comprehensive)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.job_id, replacement.job_id);
}

#[tokio::test]
async fn reset_failed_job_is_a_compare_and_set() {
    let pool = test_pool().await;
    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut job = new_job(session_id, user_id, AnalysisType::Academic);
    jobs::try_create_job(&pool, &job).await.unwrap();

    // Not failed yet: reset must refuse
    let reset = jobs::reset_failed_job(&pool, job.job_id, &AnalysisOptions::default())
        .await
        .unwrap();
    assert!(!reset);

    job.error_detail = Some(ErrorDetail {
        kind: "timeout".to_string(),
        message: "deadline exceeded".to_string(),
    });
    job.transition_to(JobStatus::Failed);
    jobs::save_job(&pool, &job).await.unwrap();

    // First reset wins, second observes the already-queued row
    assert!(jobs::reset_failed_job(&pool, job.job_id, &AnalysisOptions::default())
        .await
        .unwrap());
    assert!(!jobs::reset_failed_job(&pool, job.job_id, &AnalysisOptions::default())
        .await
        .unwrap());

    let reloaded = jobs::load_job(&pool, job.job_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, JobStatus::Queued);
    assert!(reloaded.error_detail.is_none());
    assert!(reloaded.completed_at.is_none());
}

#[tokio::test]
async fn round_trip_preserves_job_fields() {
    let pool = test_pool().await;
    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut job = new_job(session_id, user_id, AnalysisType::CollegeMatch);
    jobs::try_create_job(&pool, &job).await.unwrap();

    job.transition_to(JobStatus::Processing);
    job.content = Some(serde_json::json!({
        "text": "# Match Report",
        "format": "markdown",
        "generated_at": chrono::Utc::now().to_rfc3339(),
    }));
    job.summary = Some("Strong matches found".to_string());
    job.processing_ms = Some(1234);
    job.transition_to(JobStatus::Completed);
    jobs::save_job(&pool, &job).await.unwrap();

    let reloaded = jobs::load_job(&pool, job.job_id).await.unwrap().unwrap();
    assert_eq!(reloaded.job_id, job.job_id);
    assert_eq!(reloaded.session_id, session_id);
    assert_eq!(reloaded.user_id, user_id);
    assert_eq!(reloaded.analysis_type, AnalysisType::CollegeMatch);
    assert_eq!(reloaded.status, JobStatus::Completed);
    assert_eq!(reloaded.title, "Ava's College Match Report");
    assert_eq!(reloaded.summary.as_deref(), Some("Strong matches found"));
    assert_eq!(reloaded.processing_ms, Some(1234));
    assert_eq!(reloaded.content.unwrap()["format"], "markdown");
    assert!(reloaded.completed_at.is_some());
}

#[tokio::test]
async fn orphan_sweep_fails_non_terminal_jobs_only() {
    let pool = test_pool().await;
    let user_id = Uuid::new_v4();

    let queued = new_job(Uuid::new_v4(), user_id, AnalysisType::Comprehensive);
    jobs::try_create_job(&pool, &queued).await.unwrap();

    let mut processing = new_job(Uuid::new_v4(), user_id, AnalysisType::Comprehensive);
    jobs::try_create_job(&pool, &processing).await.unwrap();
    processing.transition_to(JobStatus::Processing);
    jobs::save_job(&pool, &processing).await.unwrap();

    let mut completed = new_job(Uuid::new_v4(), user_id, AnalysisType::Comprehensive);
    jobs::try_create_job(&pool, &completed).await.unwrap();
    completed.transition_to(JobStatus::Completed);
    jobs::save_job(&pool, &completed).await.unwrap();

    let swept = jobs::fail_orphaned_jobs(&pool).await.unwrap();
    assert_eq!(swept, 2);

    for job_id in [queued.job_id, processing.job_id] {
        let job = jobs::load_job(&pool, job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_detail.unwrap().kind, "orphaned");
    }

    let untouched = jobs::load_job(&pool, completed.job_id).await.unwrap().unwrap();
    assert_eq!(untouched.status, JobStatus::Completed);
}

#[tokio::test]
async fn list_by_session_ids_scopes_to_the_given_sessions() {
    let pool = test_pool().await;
    let user_id = Uuid::new_v4();
    let session_a = Uuid::new_v4();
    let session_b = Uuid::new_v4();
    let session_other = Uuid::new_v4();

    for session_id in [session_a, session_b, session_other] {
        let job = new_job(session_id, user_id, AnalysisType::Comprehensive);
        jobs::try_create_job(&pool, &job).await.unwrap();
    }

    let listed = jobs::list_by_session_ids(&pool, &[session_a, session_b])
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|j| j.session_id != session_other));

    let empty = jobs::list_by_session_ids(&pool, &[]).await.unwrap();
    assert!(empty.is_empty());
}
