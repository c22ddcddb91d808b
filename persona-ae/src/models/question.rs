//! Question types and constraints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported question kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
    Textarea,
    Scale,
    Boolean,
    Ranking,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Scale => "scale",
            Self::Boolean => "boolean",
            Self::Ranking => "ranking",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(Self::MultipleChoice),
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "scale" => Some(Self::Scale),
            "boolean" => Some(Self::Boolean),
            "ranking" => Some(Self::Ranking),
            _ => None,
        }
    }
}

/// Inclusive scale bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
    pub step: Option<f64>,
}

impl ScaleBounds {
    /// Exact midpoint of the scale, when it lands on a representable value
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// One rankable item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingItem {
    pub value: String,
    pub label: String,
}

/// Type-specific constraints carried by a question
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionConstraints {
    /// Allowed choice values (multiple_choice)
    pub choices: Option<Vec<String>>,
    /// Minimum text length override
    pub min_length: Option<usize>,
    /// Maximum text length override
    pub max_length: Option<usize>,
    /// Scale bounds (scale)
    pub scale: Option<ScaleBounds>,
    /// Known rankable items (ranking)
    pub items: Option<Vec<RankingItem>>,
}

/// A questionnaire question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    /// Category used for theme extraction ("personality", "values", ...)
    pub category: String,
    pub constraints: QuestionConstraints,
    pub is_required: bool,
}
