//! Shared test fixtures: in-memory database seeding and a scripted
//! Analyzer substitute.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use persona_ae::mapping::AnalysisRequest;
use persona_ae::models::AnswerValue;
use persona_ae::services::{
    AnalyzerApi, AnalyzerError, AnalyzerOutput, AnalyzerProgress, ProgressSink,
};

/// Create an in-memory pool with the full schema
pub async fn test_pool() -> SqlitePool {
    persona_ae::db::init_memory_pool()
        .await
        .expect("in-memory pool")
}

/// Insert a user profile
pub async fn seed_user(pool: &SqlitePool, first_name: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (user_id, first_name, graduation_year, equity_eligible,
                           first_generation, preferences)
        VALUES (?, ?, 2027, 0, 0, ?)
        "#,
    )
    .bind(user_id.to_string())
    .bind(first_name)
    .bind(json!({"majors": ["engineering"], "career": ["robotics"]}).to_string())
    .execute(pool)
    .await
    .expect("seed user");
    user_id
}

/// Insert a questionnaire session in the given status
pub async fn seed_session(pool: &SqlitePool, user_id: Uuid, status: &str) -> Uuid {
    let session_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO questionnaire_sessions
            (session_id, user_id, questionnaire_id, total_questions,
             answered_questions, status, started_at, completed_at)
        VALUES (?, ?, ?, 3, 3, ?, ?, ?)
        "#,
    )
    .bind(session_id.to_string())
    .bind(user_id.to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(status)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(if status == "completed" {
        Some(chrono::Utc::now().to_rfc3339())
    } else {
        None
    })
    .execute(pool)
    .await
    .expect("seed session");
    session_id
}

/// Insert a question
pub async fn seed_question(
    pool: &SqlitePool,
    question_type: &str,
    category: &str,
    constraints: serde_json::Value,
) -> Uuid {
    let question_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO questions (question_id, question_text, question_type,
                               category, constraints, is_required)
        VALUES (?, 'Tell us about yourself', ?, ?, ?, 1)
        "#,
    )
    .bind(question_id.to_string())
    .bind(question_type)
    .bind(category)
    .bind(constraints.to_string())
    .execute(pool)
    .await
    .expect("seed question");
    question_id
}

/// Insert an answer
pub async fn seed_answer(
    pool: &SqlitePool,
    session_id: Uuid,
    question_id: Uuid,
    value: &AnswerValue,
    time_spent: i64,
    revisions: i64,
) {
    sqlx::query(
        r#"
        INSERT INTO answers (session_id, question_id, value,
                             time_spent_seconds, revision_count, answered_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session_id.to_string())
    .bind(question_id.to_string())
    .bind(serde_json::to_string(value).expect("serialize answer"))
    .bind(time_spent)
    .bind(revisions)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .expect("seed answer");
}

/// Seed a completed session with a small set of realistic answers
pub async fn seed_analyzable_session(pool: &SqlitePool, user_id: Uuid) -> Uuid {
    let session_id = seed_session(pool, user_id, "completed").await;

    let q1 = seed_question(pool, "textarea", "personality", json!({})).await;
    seed_answer(
        pool,
        session_id,
        q1,
        &AnswerValue::Text("I love robotics and want to build things that help people".into()),
        95,
        1,
    )
    .await;

    let q2 = seed_question(
        pool,
        "scale",
        "academic",
        json!({"scale": {"min": 1, "max": 10}}),
    )
    .await;
    seed_answer(pool, session_id, q2, &AnswerValue::Number(8.0), 20, 0).await;

    let q3 = seed_question(pool, "textarea", "values", json!({})).await;
    seed_answer(
        pool,
        session_id,
        q3,
        &AnswerValue::Text("Justice and service to my community matter most to me.".into()),
        130,
        2,
    )
    .await;

    session_id
}

/// Scripted Analyzer behavior
#[derive(Clone, Copy)]
pub enum MockBehavior {
    /// Return a successful report
    Succeed,
    /// Fail with a gateway error
    FailGateway,
    /// Fail with a bad-request error
    FailBadRequest,
    /// Never return; exercises the orchestrator's timeout
    Hang,
}

/// Scripted Analyzer substitute with call counting
pub struct MockAnalyzer {
    behavior: Mutex<MockBehavior>,
    /// Intermediate (progress, message) updates emitted in streaming mode
    progress_updates: Vec<(i64, String)>,
    pub calls: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            progress_updates: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_progress_updates(mut self, updates: Vec<(i64, &str)>) -> Self {
        self.progress_updates = updates
            .into_iter()
            .map(|(p, m)| (p, m.to_string()))
            .collect();
        self
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalyzerOutput, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            MockBehavior::Succeed => Ok(AnalyzerOutput {
                text: format!(
                    "# Analysis Report\n\nSession {} looks promising.",
                    request.session_id
                ),
                summary: Some("A promising profile".to_string()),
                workflow_run_id: Some("run-mock".to_string()),
                elapsed_time: Some(1.5),
                total_tokens: Some(420),
            }),
            MockBehavior::FailGateway => {
                Err(AnalyzerError::Gateway("upstream unavailable".to_string()))
            }
            MockBehavior::FailBadRequest => {
                Err(AnalyzerError::BadRequest("malformed inputs".to_string()))
            }
            MockBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                unreachable!("hang behavior should be cut off by the timeout")
            }
        }
    }
}

#[async_trait]
impl AnalyzerApi for MockAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerOutput, AnalyzerError> {
        self.run(request).await
    }

    async fn analyze_with_progress(
        &self,
        request: &AnalysisRequest,
        on_progress: ProgressSink,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        for (progress, message) in &self.progress_updates {
            on_progress(AnalyzerProgress {
                stage: "processing".to_string(),
                progress: *progress,
                message: message.clone(),
            });
        }
        self.run(request).await
    }
}

/// Poll a job until it reaches a terminal state
pub async fn wait_for_terminal(
    orchestrator: &persona_ae::AnalysisOrchestrator,
    job_id: Uuid,
    user_id: Uuid,
) -> persona_ae::models::AnalysisJob {
    for _ in 0..200 {
        let job = orchestrator
            .get_status(job_id, user_id)
            .await
            .expect("job status");
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}
