//! Streaming progress protocol
//!
//! One ordered event sequence per job-with-progress request, delivered as
//! newline-delimited JSON. A stream carries exactly one terminal event
//! (completed or error) and progress never decreases within a stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage of a streamed analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Initializing,
    Processing,
    Finalizing,
    Completed,
    Error,
}

impl ProgressStage {
    /// Terminal stages close the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One progress event on the stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 0-100, non-decreasing within one stream (except the error event)
    pub progress: i64,
    pub message: String,
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Final payload, embedded in the completed event only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ProgressEvent {
    pub fn new(stage: ProgressStage, progress: i64, message: impl Into<String>, job_id: Uuid) -> Self {
        Self {
            stage,
            progress,
            message: message.into(),
            job_id,
            timestamp: Utc::now(),
            result: None,
        }
    }

    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Monotonic progress clamp for Analyzer-reported intermediate values
///
/// Intermediate updates are confined to [30, 90) and never move backwards,
/// regardless of what the engine reports.
#[derive(Debug)]
pub struct ProgressClamp {
    floor: i64,
    ceiling: i64,
    last: i64,
}

impl ProgressClamp {
    pub fn new(floor: i64, ceiling: i64) -> Self {
        Self {
            floor,
            ceiling,
            last: floor,
        }
    }

    /// Clamp a reported value into the window, never below the last value
    pub fn clamp(&mut self, reported: i64) -> i64 {
        let bounded = reported.clamp(self.floor, self.ceiling - 1);
        self.last = self.last.max(bounded);
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_monotonic_and_windowed() {
        let mut clamp = ProgressClamp::new(30, 90);
        assert_eq!(clamp.clamp(10), 30);
        assert_eq!(clamp.clamp(45), 45);
        assert_eq!(clamp.clamp(40), 45);
        assert_eq!(clamp.clamp(120), 89);
        assert_eq!(clamp.clamp(0), 89);
    }

    #[test]
    fn terminal_stages() {
        assert!(ProgressStage::Completed.is_terminal());
        assert!(ProgressStage::Error.is_terminal());
        assert!(!ProgressStage::Processing.is_terminal());
        assert!(!ProgressStage::Initializing.is_terminal());
        assert!(!ProgressStage::Finalizing.is_terminal());
    }

    #[test]
    fn result_is_omitted_unless_present() {
        let event = ProgressEvent::new(ProgressStage::Processing, 30, "working", Uuid::new_v4());
        let encoded = serde_json::to_string(&event).unwrap();
        assert!(!encoded.contains("result"));

        let event = event.with_result(serde_json::json!({"summary": "done"}));
        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains("result"));
    }
}
