//! Request mapping
//!
//! Pure transformation of raw answers and the user profile into the
//! Analyzer's request shape. Building a request performs no I/O; the only
//! failure mode is structurally invalid input.

mod context_mapper;
mod profile_mapper;
mod request_builder;

pub use context_mapper::{map_response_context, ResponseContext};
pub use profile_mapper::{
    map_user_profile, Characteristics, Demographics, Goals, NeedLevel, Preferences, UserProfile,
};
pub use request_builder::{
    build_analysis_request, infer_focus_areas, infer_urgency, AnalysisRequest, Urgency,
};

use thiserror::Error;
use uuid::Uuid;

/// Mapping failure: answers missing or structurally inconsistent with their
/// questions
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Session has no answers to analyze")]
    EmptySession,

    #[error("Answer references unknown question: {0}")]
    MissingQuestion(Uuid),
}
