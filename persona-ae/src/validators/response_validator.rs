//! Response Quality Validator
//!
//! Pure assessment of a single raw answer: structural validity against the
//! question's type and constraints, plus a 0-100 quality score with
//! completeness/thoughtfulness/authenticity/clarity breakdowns. Identical
//! inputs always yield identical output; nothing here performs I/O.
//!
//! Malformed input (a value whose variant does not match the declared
//! question type) is reported as a validation error, never a panic.

use serde::{Deserialize, Serialize};

use crate::models::{AnswerValue, Question, QuestionType};

/// Hedging phrases that suggest a non-committal answer
const GENERIC_PHRASES: &[&str] = &["i don't know", "i dont know", "not sure", "maybe", "i guess"];

/// Quality sub-scores (0-100 each)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness: i64,
    pub thoughtfulness: i64,
    pub authenticity: i64,
    pub clarity: i64,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            completeness: 100,
            thoughtfulness: 100,
            authenticity: 100,
            clarity: 100,
        }
    }
}

/// Validation outcome for one answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Overall quality score, 0-100
    pub score: i64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub metrics: QualityMetrics,
}

impl ValidationReport {
    fn valid() -> Self {
        Self {
            is_valid: true,
            score: 100,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            metrics: QualityMetrics::default(),
        }
    }

    fn structural_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
        self.score = (self.score - 30).max(0);
    }
}

/// Session-level completeness check outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessCheck {
    pub can_complete: bool,
    pub missing_required: usize,
    pub suggestions: Vec<String>,
}

/// Response Quality Validator
///
/// Text length defaults follow the questionnaire conventions: short text up
/// to 500 characters, long-form answers 10-2000 characters. Per-question
/// constraints override the defaults.
pub struct ResponseValidator {
    text_max_chars: usize,
    textarea_min_chars: usize,
    textarea_max_chars: usize,
}

impl ResponseValidator {
    pub fn new() -> Self {
        Self {
            text_max_chars: 500,
            textarea_min_chars: 10,
            textarea_max_chars: 2000,
        }
    }

    /// Validate one answer against its question
    ///
    /// `value` is None when the question was never answered.
    pub fn validate(&self, question: &Question, value: Option<&AnswerValue>) -> ValidationReport {
        let mut report = ValidationReport::valid();

        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                if question.is_required {
                    report.errors.push("This question is required".to_string());
                    report.is_valid = false;
                    report.score = 0;
                }
                // Optional question with no response is valid as-is
                return report;
            }
        };

        self.check_structure(question, value, &mut report);
        self.assess_quality(question, value, &mut report);

        report.score = report.score.clamp(0, 100);
        report
    }

    /// Session-level completeness check over (answer, question) pairs
    ///
    /// Flags missing required answers and a majority of very short text
    /// responses.
    pub fn validate_completeness(
        &self,
        responses: &[(Option<&AnswerValue>, &Question)],
    ) -> CompletenessCheck {
        let missing_required = responses
            .iter()
            .filter(|(value, question)| {
                question.is_required && value.map(|v| v.is_empty()).unwrap_or(true)
            })
            .count();

        let mut suggestions = Vec::new();
        if missing_required > 0 {
            let plural = if missing_required > 1 { "s" } else { "" };
            suggestions.push(format!(
                "Please complete {} required question{}",
                missing_required, plural
            ));
        }

        let text_answers: Vec<&str> = responses
            .iter()
            .filter(|(_, question)| {
                matches!(
                    question.question_type,
                    QuestionType::Text | QuestionType::Textarea
                )
            })
            .filter_map(|(value, _)| value.and_then(|v| v.as_text()))
            .collect();

        let short_answers = text_answers
            .iter()
            .filter(|text| word_count(text) < 5)
            .count();

        if !text_answers.is_empty() && short_answers * 2 > text_answers.len() {
            suggestions.push(
                "Consider adding more detail to your text responses for better insights"
                    .to_string(),
            );
        }

        CompletenessCheck {
            can_complete: missing_required == 0,
            missing_required,
            suggestions,
        }
    }

    fn check_structure(
        &self,
        question: &Question,
        value: &AnswerValue,
        report: &mut ValidationReport,
    ) {
        match question.question_type {
            QuestionType::MultipleChoice => match value.as_text() {
                Some(selected) => {
                    if let Some(choices) = &question.constraints.choices {
                        if !choices.iter().any(|c| c == selected) {
                            report.structural_error(
                                "Selected option is not one of the available choices",
                            );
                        }
                    }
                }
                None => report.structural_error("Please select an option"),
            },
            QuestionType::Text => match value.as_text() {
                Some(text) => {
                    let max = question.constraints.max_length.unwrap_or(self.text_max_chars);
                    let min = question.constraints.min_length.unwrap_or(1);
                    if text.chars().count() > max {
                        report.structural_error(format!(
                            "Response is too long (max {} characters)",
                            max
                        ));
                    }
                    if text.chars().count() < min {
                        report.structural_error(format!(
                            "Response is too short (min {} characters)",
                            min
                        ));
                    }
                }
                None => report.structural_error("Expected a text response"),
            },
            QuestionType::Textarea => match value.as_text() {
                Some(text) => {
                    let max = question
                        .constraints
                        .max_length
                        .unwrap_or(self.textarea_max_chars);
                    let min = question
                        .constraints
                        .min_length
                        .unwrap_or(self.textarea_min_chars);
                    if text.chars().count() < min {
                        report.structural_error(format!(
                            "Please provide a more detailed response (at least {} characters)",
                            min
                        ));
                    }
                    if text.chars().count() > max {
                        report.structural_error(format!(
                            "Response is too long (max {} characters)",
                            max
                        ));
                    }
                }
                None => report.structural_error("Expected a text response"),
            },
            QuestionType::Scale => match value.as_number() {
                Some(n) => {
                    let (min, max) = question
                        .constraints
                        .scale
                        .map(|s| (s.min, s.max))
                        .unwrap_or((1.0, 10.0));
                    if n < min || n > max {
                        report.structural_error(format!(
                            "Value must be within the scale range ({}-{})",
                            min, max
                        ));
                    }
                }
                None => report.structural_error("Please select a value on the scale"),
            },
            QuestionType::Boolean => {
                if value.as_bool().is_none() {
                    report.structural_error("Please select yes or no");
                }
            }
            QuestionType::Ranking => match value.as_ranking() {
                Some(ranked) => {
                    if ranked.is_empty() {
                        report.structural_error("Please rank at least one item");
                    } else if let Some(items) = &question.constraints.items {
                        for id in &ranked {
                            if !items.iter().any(|item| &item.value == id) {
                                report.structural_error(format!("Unknown ranking item: {}", id));
                                break;
                            }
                        }
                    }
                }
                None => report.structural_error("Expected an ordered list of items"),
            },
        }
    }

    fn assess_quality(
        &self,
        question: &Question,
        value: &AnswerValue,
        report: &mut ValidationReport,
    ) {
        match question.question_type {
            QuestionType::Text | QuestionType::Textarea => {
                if let Some(text) = value.as_text() {
                    self.assess_text_quality(text, report);
                }
            }
            QuestionType::Scale => {
                if let Some(n) = value.as_number() {
                    self.assess_scale_quality(question, n, report);
                }
            }
            QuestionType::Ranking => {
                if let Some(ranked) = value.as_ranking() {
                    self.assess_ranking_quality(&ranked, report);
                }
            }
            // Other types carry structural validation only
            _ => {}
        }
    }

    fn assess_text_quality(&self, text: &str, report: &mut ValidationReport) {
        let words = word_count(text);
        let sentences = sentence_count(text);

        if words < 3 {
            report
                .warnings
                .push("Consider providing a more detailed response".to_string());
            report.metrics.completeness = 40;
            report.score -= 15;
        } else if words < 10 {
            report.metrics.completeness = 70;
            report.score -= 5;
        }

        if sentences == 0 {
            report
                .warnings
                .push("Your response seems incomplete".to_string());
            report.metrics.thoughtfulness = 30;
            report.score -= 20;
        } else if sentences == 1 && words > 15 {
            report.suggestions.push(
                "Consider breaking your response into multiple sentences for clarity".to_string(),
            );
            report.metrics.clarity = 80;
        }

        let lower = text.to_lowercase();
        let has_generic = GENERIC_PHRASES.iter().any(|phrase| lower.contains(phrase));
        if has_generic && words < 10 {
            report
                .suggestions
                .push("Try to be more specific about your thoughts and feelings".to_string());
            report.metrics.authenticity = 60;
            report.score -= 10;
        }

        if words >= 10 && sentences >= 1 {
            report
                .suggestions
                .push("Great job providing a thoughtful, detailed response!".to_string());
        }
    }

    fn assess_scale_quality(&self, question: &Question, n: f64, report: &mut ValidationReport) {
        let bounds = question
            .constraints
            .scale
            .unwrap_or(crate::models::ScaleBounds {
                min: 1.0,
                max: 10.0,
                step: None,
            });

        // Boundary and midpoint picks are advisory only, never errors
        if n == bounds.min || n == bounds.max {
            report.suggestions.push(
                "Extreme values are perfectly valid! You might consider explaining your \
                 reasoning in follow-up questions."
                    .to_string(),
            );
        }

        if n == bounds.midpoint() {
            report.suggestions.push(
                "You chose a middle value. This might indicate mixed feelings - that's \
                 completely normal!"
                    .to_string(),
            );
        }
    }

    fn assess_ranking_quality(&self, ranked: &[String], report: &mut ValidationReport) {
        if ranked.len() < 3 {
            report.suggestions.push(
                "Consider ranking more items to give us better insights into your preferences"
                    .to_string(),
            );
            report.metrics.completeness = 70;
            report.score -= 10;
        }

        if ranked.len() >= 5 {
            report.suggestions.push(
                "Excellent! Your comprehensive ranking helps us understand your priorities \
                 better."
                    .to_string(),
            );
        }
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub(crate) fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

// ============================================================================
// Tests
// ============================================================================
