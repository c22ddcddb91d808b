//! Questionnaire session and user profile records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

/// One completed (or in-flight) questionnaire attempt
///
/// Owned by exactly one user; immutable once completed except for analysis
/// linkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub questionnaire_id: Uuid,
    pub total_questions: i64,
    pub answered_questions: i64,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// User profile record consumed by the mapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub graduation_year: Option<i32>,
    pub school_name: Option<String>,
    pub location: Option<String>,
    pub equity_eligible: bool,
    pub first_generation: bool,
    /// Free-form preferences blob; mapper reads it with best-effort lookups
    pub preferences: serde_json::Value,
}
