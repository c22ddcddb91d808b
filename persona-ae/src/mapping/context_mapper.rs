//! Response context mapping
//!
//! Combines a raw answer, its quality report, and the owning question into
//! one normalized record: value, free-text themes, coarse emotion tags, and
//! authenticity indicators derived from the quality sub-scores.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Answer, AnswerValue, Question, QuestionType};
use crate::validators::{Complexity, ResponseAnalytics, Sentiment, ValidationReport};

/// Sub-score threshold above which a named authenticity indicator is emitted
const INDICATOR_THRESHOLD: i64 = 80;

/// Per-category theme vocabulary for keyword extraction
const THEME_VOCABULARY: &[(&str, &[&str])] = &[
    (
        "personality",
        &["leadership", "creativity", "collaboration", "independence", "empathy"],
    ),
    (
        "academic",
        &["research", "learning", "discovery", "knowledge", "innovation"],
    ),
    (
        "values",
        &["justice", "equality", "service", "growth", "authenticity", "integrity"],
    ),
    (
        "career",
        &["impact", "success", "fulfillment", "challenge", "stability"],
    ),
    (
        "social",
        &["community", "relationships", "diversity", "inclusion", "connection"],
    ),
];

/// Emotion keyword lists, tagged on match as "category:word"
const EMOTION_VOCABULARY: &[(&str, &[&str])] = &[
    (
        "positive",
        &["excited", "happy", "passionate", "enthusiastic", "motivated", "confident"],
    ),
    (
        "negative",
        &["worried", "anxious", "frustrated", "disappointed", "confused", "overwhelmed"],
    ),
    (
        "neutral",
        &["curious", "thoughtful", "reflective", "contemplative", "analytical"],
    ),
];

/// One normalized (question, answer) record ready for the Analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseContext {
    pub question_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub category: String,
    pub value: AnswerValue,
    /// Total string rendering of the value
    pub display_text: String,
    pub time_spent_seconds: i64,
    pub revision_count: i64,
    /// Overall quality score from validation
    pub quality_score: i64,
    pub sentiment: Option<Sentiment>,
    pub complexity: Complexity,
    pub word_count: usize,
    pub character_count: usize,
    pub themes: Vec<String>,
    pub emotions: Vec<String>,
    pub authenticity_indicators: Vec<String>,
}

/// Build the normalized record for one answer
pub fn map_response_context(
    question: &Question,
    answer: &Answer,
    report: &ValidationReport,
    analytics: &ResponseAnalytics,
) -> ResponseContext {
    ResponseContext {
        question_id: question.question_id,
        question_text: question.question_text.clone(),
        question_type: question.question_type,
        category: question.category.clone(),
        value: answer.value.clone(),
        display_text: answer.value.display_text(),
        time_spent_seconds: answer.time_spent_seconds,
        revision_count: answer.revision_count,
        quality_score: report.score,
        sentiment: analytics.sentiment,
        complexity: analytics.complexity,
        word_count: analytics.word_count,
        character_count: analytics.character_count,
        themes: extract_themes(&answer.value, &question.category),
        emotions: extract_emotions(&answer.value),
        authenticity_indicators: extract_authenticity_indicators(report, analytics),
    }
}

/// Keyword-match themes from the question category's vocabulary
fn extract_themes(value: &AnswerValue, category: &str) -> Vec<String> {
    let Some(text) = value.as_text() else {
        return Vec::new();
    };
    let lower = text.to_lowercase();

    THEME_VOCABULARY
        .iter()
        .find(|(cat, _)| *cat == category)
        .map(|(_, vocabulary)| {
            vocabulary
                .iter()
                .filter(|theme| lower.contains(*theme))
                .map(|theme| theme.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Keyword-match emotion tags across all emotion categories
fn extract_emotions(value: &AnswerValue) -> Vec<String> {
    let Some(text) = value.as_text() else {
        return Vec::new();
    };
    let lower = text.to_lowercase();

    let mut emotions = Vec::new();
    for (category, words) in EMOTION_VOCABULARY {
        for word in *words {
            if lower.contains(word) {
                emotions.push(format!("{}:{}", category, word));
            }
        }
    }
    emotions
}

/// Named indicators from the quality sub-scores
fn extract_authenticity_indicators(
    report: &ValidationReport,
    analytics: &ResponseAnalytics,
) -> Vec<String> {
    let mut indicators = Vec::new();

    if report.metrics.authenticity >= INDICATOR_THRESHOLD {
        indicators.push("highly_authentic".to_string());
    }
    if report.metrics.thoughtfulness >= INDICATOR_THRESHOLD {
        indicators.push("deeply_thoughtful".to_string());
    }
    if report.metrics.clarity >= INDICATOR_THRESHOLD {
        indicators.push("clearly_expressed".to_string());
    }
    if analytics.complexity == Complexity::Complex {
        indicators.push("complex_thinking".to_string());
    }

    indicators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionConstraints;
    use crate::validators::{generate_analytics, ResponseValidator};
    use chrono::Utc;

    fn question(category: &str) -> Question {
        Question {
            question_id: Uuid::new_v4(),
            question_text: "What matters to you?".to_string(),
            question_type: QuestionType::Textarea,
            category: category.to_string(),
            constraints: QuestionConstraints::default(),
            is_required: true,
        }
    }

    fn answer(question_id: Uuid, text: &str) -> Answer {
        Answer {
            session_id: Uuid::new_v4(),
            question_id,
            value: AnswerValue::Text(text.to_string()),
            time_spent_seconds: 95,
            revision_count: 2,
            answered_at: Utc::now(),
        }
    }

    fn map(category: &str, text: &str) -> ResponseContext {
        let q = question(category);
        let a = answer(q.question_id, text);
        let report = ResponseValidator::new().validate(&q, Some(&a.value));
        let analytics = generate_analytics(&a.value, a.time_spent_seconds, a.revision_count);
        map_response_context(&q, &a, &report, &analytics)
    }

    #[test]
    fn themes_match_category_vocabulary_only() {
        let context = map(
            "values",
            "I care about justice and service, and leadership in my community.",
        );
        assert_eq!(context.themes, vec!["justice", "service"]);

        let context = map(
            "personality",
            "I care about justice and service, and leadership in my community.",
        );
        assert_eq!(context.themes, vec!["leadership"]);
    }

    #[test]
    fn unknown_category_yields_no_themes() {
        let context = map("logistics", "leadership and justice everywhere");
        assert!(context.themes.is_empty());
    }

    #[test]
    fn emotions_are_tagged_with_category() {
        let context = map(
            "personality",
            "I am excited about college but worried about the essays.",
        );
        assert!(context.emotions.contains(&"positive:excited".to_string()));
        assert!(context.emotions.contains(&"negative:worried".to_string()));
    }

    #[test]
    fn high_sub_scores_emit_named_indicators() {
        let context = map(
            "personality",
            "I organize study groups because collaboration helps everyone learn. \
             Teaching a concept is the best way to understand it.",
        );
        assert!(context
            .authenticity_indicators
            .contains(&"highly_authentic".to_string()));
        assert!(context
            .authenticity_indicators
            .contains(&"deeply_thoughtful".to_string()));
        assert!(context
            .authenticity_indicators
            .contains(&"clearly_expressed".to_string()));
    }

    #[test]
    fn complex_answers_add_complex_thinking() {
        let long = std::iter::repeat("insightful words about my goals and plans")
            .take(10)
            .collect::<Vec<_>>()
            .join(" ");
        let context = map("academic", &format!("{}.", long));
        assert!(context
            .authenticity_indicators
            .contains(&"complex_thinking".to_string()));
    }

    #[test]
    fn non_text_values_have_no_text_features() {
        let q = Question {
            question_type: QuestionType::Scale,
            ..question("personality")
        };
        let a = Answer {
            session_id: Uuid::new_v4(),
            question_id: q.question_id,
            value: AnswerValue::Number(8.0),
            time_spent_seconds: 12,
            revision_count: 0,
            answered_at: Utc::now(),
        };
        let report = ResponseValidator::new().validate(&q, Some(&a.value));
        let analytics = generate_analytics(&a.value, 12, 0);
        let context = map_response_context(&q, &a, &report, &analytics);

        assert!(context.themes.is_empty());
        assert!(context.emotions.is_empty());
        assert_eq!(context.display_text, "8");
    }
}
