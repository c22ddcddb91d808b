//! Session, answer, question, and user reads
//!
//! The read side of the questionnaire store. This subsystem never writes
//! these tables; sessions and answers are produced by the questionnaire
//! service.

use persona_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    Answer, AnswerValue, Question, QuestionConstraints, QuestionType, QuestionnaireSession,
    SessionStatus, UserRecord,
};

/// Load a session by id
///
/// Ownership is checked by the caller against `user_id` so absent sessions
/// and foreign sessions produce distinct errors.
pub async fn get_session(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Option<QuestionnaireSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, user_id, questionnaire_id, total_questions,
               answered_questions, status, started_at, completed_at
        FROM questionnaire_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let user_id: String = row.get("user_id");
            let user_id = Uuid::parse_str(&user_id)
                .map_err(|e| Error::CorruptRecord(format!("user_id: {}", e)))?;

            let questionnaire_id: String = row.get("questionnaire_id");
            let questionnaire_id = Uuid::parse_str(&questionnaire_id)
                .map_err(|e| Error::CorruptRecord(format!("questionnaire_id: {}", e)))?;

            let status: String = row.get("status");
            let status = SessionStatus::parse(&status)
                .ok_or_else(|| Error::CorruptRecord(format!("unknown session status: {}", status)))?;

            let started_at: String = row.get("started_at");
            let started_at = chrono::DateTime::parse_from_rfc3339(&started_at)
                .map_err(|e| Error::CorruptRecord(format!("started_at: {}", e)))?
                .with_timezone(&chrono::Utc);

            let completed_at: Option<String> = row.get("completed_at");
            let completed_at = completed_at
                .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
                .transpose()
                .map_err(|e| Error::CorruptRecord(format!("completed_at: {}", e)))?
                .map(|dt| dt.with_timezone(&chrono::Utc));

            Ok(Some(QuestionnaireSession {
                session_id,
                user_id,
                questionnaire_id,
                total_questions: row.get("total_questions"),
                answered_questions: row.get("answered_questions"),
                status,
                started_at,
                completed_at,
            }))
        }
        None => Ok(None),
    }
}

/// Load all answers for a session
pub async fn get_answers(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<Answer>> {
    let rows = sqlx::query(
        r#"
        SELECT session_id, question_id, value, time_spent_seconds,
               revision_count, answered_at
        FROM answers
        WHERE session_id = ?
        ORDER BY answered_at
        "#,
    )
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let question_id: String = row.get("question_id");
            let question_id = Uuid::parse_str(&question_id)
                .map_err(|e| Error::CorruptRecord(format!("question_id: {}", e)))?;

            let value: String = row.get("value");
            let value: AnswerValue = serde_json::from_str(&value)
                .map_err(|e| Error::CorruptRecord(format!("answer value: {}", e)))?;

            let answered_at: String = row.get("answered_at");
            let answered_at = chrono::DateTime::parse_from_rfc3339(&answered_at)
                .map_err(|e| Error::CorruptRecord(format!("answered_at: {}", e)))?
                .with_timezone(&chrono::Utc);

            Ok(Answer {
                session_id,
                question_id,
                value,
                time_spent_seconds: row.get("time_spent_seconds"),
                revision_count: row.get("revision_count"),
                answered_at,
            })
        })
        .collect()
}

/// Load a question by id
pub async fn get_question(pool: &SqlitePool, question_id: Uuid) -> Result<Option<Question>> {
    let row = sqlx::query(
        r#"
        SELECT question_id, question_text, question_type, category,
               constraints, is_required
        FROM questions
        WHERE question_id = ?
        "#,
    )
    .bind(question_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let question_type: String = row.get("question_type");
            let question_type = QuestionType::parse(&question_type).ok_or_else(|| {
                Error::CorruptRecord(format!("unknown question type: {}", question_type))
            })?;

            let constraints: String = row.get("constraints");
            let constraints: QuestionConstraints = serde_json::from_str(&constraints)
                .map_err(|e| Error::CorruptRecord(format!("constraints: {}", e)))?;

            Ok(Some(Question {
                question_id,
                question_text: row.get("question_text"),
                question_type,
                category: row.get("category"),
                constraints,
                is_required: row.get::<i64, _>("is_required") != 0,
            }))
        }
        None => Ok(None),
    }
}

/// Load a user profile record
pub async fn get_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, first_name, last_name, graduation_year, school_name,
               location, equity_eligible, first_generation, preferences
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let preferences: String = row.get("preferences");
            let preferences: serde_json::Value = serde_json::from_str(&preferences)
                .map_err(|e| Error::CorruptRecord(format!("preferences: {}", e)))?;

            Ok(Some(UserRecord {
                user_id,
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                graduation_year: row.get("graduation_year"),
                school_name: row.get("school_name"),
                location: row.get("location"),
                equity_eligible: row.get::<i64, _>("equity_eligible") != 0,
                first_generation: row.get::<i64, _>("first_generation") != 0,
                preferences,
            }))
        }
        None => Ok(None),
    }
}
