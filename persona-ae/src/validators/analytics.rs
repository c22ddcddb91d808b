//! Response analytics
//!
//! Lightweight per-answer engagement metrics computed alongside validation:
//! character/word counts, a coarse keyword sentiment, and a word-count
//! driven complexity rating.

use serde::{Deserialize, Serialize};

use crate::models::AnswerValue;

use super::response_validator::word_count;

const POSITIVE_WORDS: &[&str] = &[
    "happy", "excited", "love", "great", "awesome", "amazing", "wonderful",
];
const NEGATIVE_WORDS: &[&str] = &[
    "sad", "worried", "anxious", "difficult", "hard", "challenging", "frustrated",
];

/// Coarse sentiment of a free-text answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Word-count driven complexity rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Engagement metrics for one answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAnalytics {
    pub time_spent_seconds: i64,
    pub revision_count: i64,
    pub character_count: usize,
    pub word_count: usize,
    pub sentiment: Option<Sentiment>,
    pub complexity: Complexity,
}

/// Compute analytics for one answer
///
/// Non-textual answers carry only the timing metrics; counts stay zero and
/// sentiment is absent.
pub fn generate_analytics(
    value: &AnswerValue,
    time_spent_seconds: i64,
    revision_count: i64,
) -> ResponseAnalytics {
    let mut analytics = ResponseAnalytics {
        time_spent_seconds,
        revision_count,
        character_count: 0,
        word_count: 0,
        sentiment: None,
        complexity: Complexity::Simple,
    };

    if let Some(text) = value.as_text() {
        analytics.character_count = text.chars().count();
        analytics.word_count = word_count(text);

        analytics.complexity = if analytics.word_count > 50 {
            Complexity::Complex
        } else if analytics.word_count > 10 {
            Complexity::Moderate
        } else {
            Complexity::Simple
        };

        let lower = text.to_lowercase();
        let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
        let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

        analytics.sentiment = Some(if positive > negative {
            Sentiment::Positive
        } else if negative > positive {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        });
    }

    analytics
}
