//! Analysis request assembly
//!
//! Combines the mapped response contexts and profile summary into the
//! single immutable request submitted to the Analyzer, with two advisory
//! hints inferred purely from the response set: focus areas and urgency.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnalysisOptions, AnalysisType, UserRecord};

use super::context_mapper::ResponseContext;
use super::profile_mapper::{map_user_profile, UserProfile};
use super::MappingError;

/// Advisory engagement hint for the Analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Immutable, Analyzer-ready request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub analysis_type: AnalysisType,
    pub responses: Vec<ResponseContext>,
    pub profile: UserProfile,
    pub options: AnalysisOptions,
    /// Union of categories and themes seen in the responses
    pub focus_areas: Vec<String>,
    pub urgency: Urgency,
}

/// Build the analysis request
///
/// Fails only on structurally invalid input (no responses); everything else
/// is best-effort enrichment.
pub fn build_analysis_request(
    user: &UserRecord,
    session_id: Uuid,
    responses: Vec<ResponseContext>,
    analysis_type: AnalysisType,
    options: AnalysisOptions,
    current_year: i32,
) -> Result<AnalysisRequest, MappingError> {
    if responses.is_empty() {
        return Err(MappingError::EmptySession);
    }

    let focus_areas = infer_focus_areas(&responses);
    let urgency = infer_urgency(&responses);

    Ok(AnalysisRequest {
        user_id: user.user_id,
        session_id,
        analysis_type,
        profile: map_user_profile(user, current_year),
        options,
        focus_areas,
        urgency,
        responses,
    })
}

/// Ordered union of response categories and extracted themes
pub fn infer_focus_areas(responses: &[ResponseContext]) -> Vec<String> {
    let mut areas = Vec::new();
    for response in responses {
        if !areas.contains(&response.category) {
            areas.push(response.category.clone());
        }
        for theme in &response.themes {
            if !areas.contains(theme) {
                areas.push(theme.clone());
            }
        }
    }
    areas
}

/// Engagement-derived urgency hint
///
/// High: long dwell time and frequent revisions. Medium: either signal on
/// its own. Low: quick, untouched answers.
pub fn infer_urgency(responses: &[ResponseContext]) -> Urgency {
    if responses.is_empty() {
        return Urgency::Low;
    }

    let count = responses.len() as f64;
    let avg_time_spent =
        responses.iter().map(|r| r.time_spent_seconds as f64).sum::<f64>() / count;
    let revision_rate =
        responses.iter().filter(|r| r.revision_count > 0).count() as f64 / count;

    if avg_time_spent > 120.0 && revision_rate > 0.3 {
        Urgency::High
    } else if avg_time_spent > 60.0 || revision_rate > 0.1 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, AnswerValue, Question, QuestionConstraints, QuestionType};
    use crate::validators::{generate_analytics, ResponseValidator};
    use chrono::Utc;
    use serde_json::json;

    fn context(category: &str, text: &str, time_spent: i64, revisions: i64) -> ResponseContext {
        let question = Question {
            question_id: Uuid::new_v4(),
            question_text: "Q".to_string(),
            question_type: QuestionType::Textarea,
            category: category.to_string(),
            constraints: QuestionConstraints::default(),
            is_required: true,
        };
        let answer = Answer {
            session_id: Uuid::new_v4(),
            question_id: question.question_id,
            value: AnswerValue::Text(text.to_string()),
            time_spent_seconds: time_spent,
            revision_count: revisions,
            answered_at: Utc::now(),
        };
        let report = ResponseValidator::new().validate(&question, Some(&answer.value));
        let analytics = generate_analytics(&answer.value, time_spent, revisions);
        super::super::map_response_context(&question, &answer, &report, &analytics)
    }

    fn test_user() -> UserRecord {
        UserRecord {
            user_id: Uuid::new_v4(),
            first_name: Some("Ava".to_string()),
            last_name: None,
            graduation_year: Some(2027),
            school_name: None,
            location: None,
            equity_eligible: false,
            first_generation: false,
            preferences: json!({}),
        }
    }

    #[test]
    fn empty_session_is_a_mapping_error() {
        let result = build_analysis_request(
            &test_user(),
            Uuid::new_v4(),
            Vec::new(),
            AnalysisType::Comprehensive,
            AnalysisOptions::default(),
            2026,
        );
        assert!(matches!(result, Err(MappingError::EmptySession)));
    }

    #[test]
    fn focus_areas_union_categories_and_themes_without_duplicates() {
        let responses = vec![
            context("values", "Justice and service guide everything I choose to do.", 30, 0),
            context("values", "Service to my neighborhood matters most to me here.", 30, 0),
            context("career", "I want my work to have a real impact on people.", 30, 0),
        ];
        let areas = infer_focus_areas(&responses);
        assert_eq!(areas, vec!["values", "justice", "service", "career", "impact"]);
    }

    #[test]
    fn urgency_high_requires_both_signals() {
        let engaged = vec![
            context("values", "Long reflective answer about my life and goals.", 150, 1),
            context("career", "Another long reflective answer with many edits.", 140, 2),
        ];
        assert_eq!(infer_urgency(&engaged), Urgency::High);

        let slow_but_unedited = vec![
            context("values", "Long reflective answer about my life and goals.", 150, 0),
            context("career", "Another long reflective answer, written once.", 140, 0),
        ];
        assert_eq!(infer_urgency(&slow_but_unedited), Urgency::Medium);

        let quick = vec![
            context("values", "Short answer written quickly without any edits.", 20, 0),
            context("career", "Another short answer without a second thought.", 15, 0),
        ];
        assert_eq!(infer_urgency(&quick), Urgency::Low);
    }

    #[test]
    fn revision_rate_alone_reaches_medium() {
        let responses = vec![
            context("values", "Answer revised once before submitting it here.", 20, 1),
            context("career", "Answer left alone after the first attempt.", 20, 0),
        ];
        assert_eq!(infer_urgency(&responses), Urgency::Medium);
    }

    #[test]
    fn request_assembly_carries_profile_and_hints() {
        let user = test_user();
        let session_id = Uuid::new_v4();
        let responses = vec![context(
            "personality",
            "Leadership means listening first and deciding together.",
            130,
            1,
        )];

        let request = build_analysis_request(
            &user,
            session_id,
            responses,
            AnalysisType::Personality,
            AnalysisOptions::default(),
            2026,
        )
        .unwrap();

        assert_eq!(request.session_id, session_id);
        assert_eq!(request.user_id, user.user_id);
        assert_eq!(request.profile.demographics.grade.as_deref(), Some("11th"));
        assert!(request.focus_areas.contains(&"personality".to_string()));
        assert!(request.focus_areas.contains(&"leadership".to_string()));
    }
}
