//! Analysis job state machine
//!
//! A job progresses queued → processing → {completed, failed}. The only
//! re-entry transition is failed → queued via an explicit retry. Completed
//! jobs are authoritative for their (session, type) pair and are returned
//! from cache rather than recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of analysis a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Personality,
    Academic,
    CollegeMatch,
    Comprehensive,
}

impl AnalysisType {
    /// Stable string form used in the database and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personality => "personality",
            Self::Academic => "academic",
            Self::CollegeMatch => "college_match",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Parse from the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personality" => Some(Self::Personality),
            "academic" => Some(Self::Academic),
            "college_match" => Some(Self::CollegeMatch),
            "comprehensive" => Some(Self::Comprehensive),
            _ => None,
        }
    }

    /// Human-readable report title for this analysis type
    ///
    /// `first_name` personalizes the title when known ("Ava's Personality
    /// Analysis"), otherwise falls back to "Your ...".
    pub fn report_title(&self, first_name: Option<&str>) -> String {
        let owner = match first_name {
            Some(name) if !name.trim().is_empty() => format!("{}'s", name.trim()),
            _ => "Your".to_string(),
        };

        match self {
            Self::Personality => format!("{} Personality Analysis", owner),
            Self::Academic => format!("{} Academic Profile", owner),
            Self::CollegeMatch => format!("{} College Match Report", owner),
            Self::Comprehensive => format!("{} Complete Persona Analysis", owner),
        }
    }
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, waiting for a worker
    Queued,
    /// Execution in flight
    Processing,
    /// Result stored; authoritative for the (session, type) pair
    Completed,
    /// Terminal until an explicit retry resets to Queued
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub job_id: Uuid,
    pub old_status: JobStatus,
    pub new_status: JobStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// Structured failure detail stored on a failed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error kind ("timeout", "bad_request", "gateway", "not_configured",
    /// "mapping", "persistence", "orphaned")
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

/// Requested depth of the generated report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Summary,
    #[default]
    Detailed,
    Comprehensive,
}

/// Caller-supplied analysis options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub include_recommendations: bool,
    pub include_college_matches: bool,
    pub include_essay_guidance: bool,
    pub detail_level: DetailLevel,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_recommendations: true,
            include_college_matches: true,
            include_essay_guidance: false,
            detail_level: DetailLevel::Detailed,
        }
    }
}

/// One requested analysis (type + session) with its own lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub analysis_type: AnalysisType,
    pub status: JobStatus,
    /// Human-readable report title
    pub title: String,
    /// Options the analysis was requested with
    pub options: AnalysisOptions,
    /// Result payload, present only when completed
    pub content: Option<serde_json::Value>,
    /// Short result summary, present only when completed
    pub summary: Option<String>,
    /// Failure detail, present only when failed
    pub error_detail: Option<ErrorDetail>,
    /// Wall-clock execution duration, recorded at completion
    pub processing_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    /// Create a new job in the Queued state
    pub fn new(
        session_id: Uuid,
        user_id: Uuid,
        analysis_type: AnalysisType,
        title: String,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            session_id,
            user_id,
            analysis_type,
            status: JobStatus::Queued,
            title,
            options,
            content: None,
            summary: None,
            error_detail: None,
            processing_ms: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition to a new status
    ///
    /// Terminal states stamp `completed_at`; resetting to Queued (retry)
    /// clears the previous attempt's outcome fields.
    pub fn transition_to(&mut self, new_status: JobStatus) -> StatusTransition {
        let transition = StatusTransition {
            job_id: self.job_id,
            old_status: self.status,
            new_status,
            transitioned_at: Utc::now(),
        };
        self.status = new_status;

        match new_status {
            JobStatus::Completed | JobStatus::Failed => {
                self.completed_at = Some(Utc::now());
            }
            JobStatus::Queued => {
                self.content = None;
                self.summary = None;
                self.error_detail = None;
                self.processing_ms = None;
                self.completed_at = None;
            }
            JobStatus::Processing => {}
        }

        transition
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check if the job may be retried (failed is the only retryable state)
    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_queued() {
        let job = AnalysisJob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AnalysisType::Comprehensive,
            "Your Complete Persona Analysis".to_string(),
            AnalysisOptions::default(),
        );
        assert_eq!(job.status, JobStatus::Queued);
        assert!(!job.is_terminal());
        assert!(!job.can_retry());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn terminal_transition_stamps_completed_at() {
        let mut job = AnalysisJob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AnalysisType::Personality,
            "Your Personality Analysis".to_string(),
            AnalysisOptions::default(),
        );
        job.transition_to(JobStatus::Processing);
        assert!(job.completed_at.is_none());

        let transition = job.transition_to(JobStatus::Completed);
        assert_eq!(transition.old_status, JobStatus::Processing);
        assert_eq!(transition.new_status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.is_terminal());
    }

    #[test]
    fn retry_reset_clears_previous_outcome() {
        let mut job = AnalysisJob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AnalysisType::Academic,
            "Your Academic Profile".to_string(),
            AnalysisOptions::default(),
        );
        job.transition_to(JobStatus::Processing);
        job.error_detail = Some(ErrorDetail {
            kind: "timeout".to_string(),
            message: "Analyzer call timed out".to_string(),
        });
        job.transition_to(JobStatus::Failed);
        assert!(job.can_retry());

        job.transition_to(JobStatus::Queued);
        assert!(job.error_detail.is_none());
        assert!(job.completed_at.is_none());
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn report_title_personalizes_when_name_known() {
        assert_eq!(
            AnalysisType::Personality.report_title(Some("Ava")),
            "Ava's Personality Analysis"
        );
        assert_eq!(
            AnalysisType::CollegeMatch.report_title(None),
            "Your College Match Report"
        );
        assert_eq!(
            AnalysisType::Comprehensive.report_title(Some("  ")),
            "Your Complete Persona Analysis"
        );
    }

    #[test]
    fn analysis_type_round_trips_through_str() {
        for t in [
            AnalysisType::Personality,
            AnalysisType::Academic,
            AnalysisType::CollegeMatch,
            AnalysisType::Comprehensive,
        ] {
            assert_eq!(AnalysisType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AnalysisType::parse("astrology"), None);
    }
}
