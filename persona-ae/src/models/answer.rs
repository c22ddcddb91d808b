//! Answer value representation
//!
//! Responses arrive as free text, numbers, or nested structures (ranking
//! lists, schedules, rich-text documents). They are modeled as a tagged
//! union with a total string conversion per variant, so no code path ever
//! inspects runtime types ad hoc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AnswerValue {
    /// Free text (text, textarea, multiple_choice selection)
    Text(String),
    /// Numeric (scale)
    Number(f64),
    /// Anything richer: booleans, ranking lists, nested objects
    Structured(serde_json::Value),
}

impl AnswerValue {
    /// Total conversion to display text
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Self::Structured(v) => match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            },
        }
    }

    /// Check whether the value carries no usable content
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
            Self::Structured(v) => match v {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.trim().is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
                _ => false,
            },
        }
    }

    /// Free-text view, when the value is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Numeric view, when the value is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Structured(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Boolean view, when the value is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Structured(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Ordered list of string identifiers, when the value is a ranking
    pub fn as_ranking(&self) -> Option<Vec<String>> {
        match self {
            Self::Structured(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(|s| s.to_string()))
                .collect(),
            _ => None,
        }
    }
}

/// One response to one question within a session
///
/// Unique per (session_id, question_id); read-only once the session is
/// completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub value: AnswerValue,
    pub time_spent_seconds: i64,
    pub revision_count: i64,
    pub answered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_text_is_total_over_variants() {
        assert_eq!(AnswerValue::Text("hello".into()).display_text(), "hello");
        assert_eq!(AnswerValue::Number(7.0).display_text(), "7");
        assert_eq!(AnswerValue::Number(7.5).display_text(), "7.5");
        assert_eq!(
            AnswerValue::Structured(json!(["debate", "robotics"])).display_text(),
            "debate, robotics"
        );
        assert_eq!(
            AnswerValue::Structured(json!({"monday": "practice"})).display_text(),
            r#"{"monday":"practice"}"#
        );
        assert_eq!(AnswerValue::Structured(json!(true)).display_text(), "true");
    }

    #[test]
    fn emptiness_per_variant() {
        assert!(AnswerValue::Text("   ".into()).is_empty());
        assert!(!AnswerValue::Text("x".into()).is_empty());
        assert!(!AnswerValue::Number(0.0).is_empty());
        assert!(AnswerValue::Structured(json!(null)).is_empty());
        assert!(AnswerValue::Structured(json!([])).is_empty());
        assert!(!AnswerValue::Structured(json!(false)).is_empty());
    }

    #[test]
    fn ranking_view_requires_string_items() {
        let ranking = AnswerValue::Structured(json!(["a", "b", "c"]));
        assert_eq!(
            ranking.as_ranking(),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );

        let mixed = AnswerValue::Structured(json!(["a", 2]));
        assert_eq!(mixed.as_ranking(), None);
    }

    #[test]
    fn serde_tagging_round_trips() {
        let value = AnswerValue::Number(8.0);
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: AnswerValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, value);
    }
}
