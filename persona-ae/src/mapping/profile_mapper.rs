//! User profile mapping
//!
//! Derives the Analyzer-facing profile summary from the raw user record.
//! Preference and goal lists come from a free-form JSON blob via
//! best-effort key lookups; absent or oddly-shaped data yields empty lists,
//! never an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::UserRecord;

/// Inferred financial-need tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographics {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub graduation_year: Option<i32>,
    pub school_name: Option<String>,
    /// "9th" through "12th" when derivable from the graduation year
    pub grade: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Characteristics {
    pub equity_eligible: bool,
    pub first_generation: bool,
    pub financial_need_level: Option<NeedLevel>,
    pub learning_style: Vec<String>,
    pub personality_traits: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub college_types: Vec<String>,
    pub major_interests: Vec<String>,
    pub activity_preferences: Vec<String>,
    pub geographic_preferences: Vec<String>,
    pub cultural_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goals {
    pub career_aspirations: Vec<String>,
    pub academic_goals: Vec<String>,
    pub personal_growth_areas: Vec<String>,
    pub impact_areas: Vec<String>,
}

/// Analyzer-facing user profile summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub demographics: Demographics,
    pub characteristics: Characteristics,
    pub preferences: Preferences,
    pub goals: Goals,
}

/// Map a raw user record into the profile summary
///
/// `current_year` is passed in so the mapping stays a pure function.
pub fn map_user_profile(user: &UserRecord, current_year: i32) -> UserProfile {
    let prefs = &user.preferences;

    UserProfile {
        user_id: user.user_id,
        demographics: Demographics {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            graduation_year: user.graduation_year,
            school_name: user.school_name.clone(),
            grade: calculate_grade(user.graduation_year, current_year),
            location: user.location.clone(),
        },
        characteristics: Characteristics {
            equity_eligible: user.equity_eligible,
            first_generation: user.first_generation,
            financial_need_level: infer_financial_need(user),
            learning_style: string_list(prefs, &["learningStyle"]),
            personality_traits: trait_map(prefs),
        },
        preferences: Preferences {
            college_types: string_list(prefs, &["collegeTypes"]),
            major_interests: string_list(prefs, &["majors", "academicInterests"]),
            activity_preferences: string_list(prefs, &["activities", "extracurriculars"]),
            geographic_preferences: string_list(prefs, &["geography", "location"]),
            cultural_values: string_list(prefs, &["values", "culture"]),
        },
        goals: Goals {
            career_aspirations: string_list(prefs, &["career", "careerGoals"]),
            academic_goals: string_list(prefs, &["academic", "academicGoals"]),
            personal_growth_areas: string_list(prefs, &["growth", "personalGrowth"]),
            impact_areas: string_list(prefs, &["impact", "socialImpact"]),
        },
    }
}

/// Derive "9th".."12th" from the graduation year
fn calculate_grade(graduation_year: Option<i32>, current_year: i32) -> Option<String> {
    let graduation_year = graduation_year?;
    let grade = 12 - (graduation_year - current_year);
    if (9..=12).contains(&grade) {
        Some(format!("{}th", grade))
    } else {
        None
    }
}

fn infer_financial_need(user: &UserRecord) -> Option<NeedLevel> {
    if user.equity_eligible {
        Some(NeedLevel::High)
    } else {
        None
    }
}

/// First present key wins; a single string becomes a one-element list
fn string_list(prefs: &serde_json::Value, keys: &[&str]) -> Vec<String> {
    for key in keys {
        match prefs.get(key) {
            Some(serde_json::Value::Array(items)) => {
                return items
                    .iter()
                    .filter_map(|item| item.as_str().map(|s| s.to_string()))
                    .collect();
            }
            Some(serde_json::Value::String(s)) => return vec![s.clone()],
            _ => continue,
        }
    }
    Vec::new()
}

fn trait_map(prefs: &serde_json::Value) -> HashMap<String, f64> {
    prefs
        .get("personalityTraits")
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(preferences: serde_json::Value) -> UserRecord {
        UserRecord {
            user_id: Uuid::new_v4(),
            first_name: Some("Ava".to_string()),
            last_name: Some("Nguyen".to_string()),
            graduation_year: Some(2027),
            school_name: Some("Lincoln High".to_string()),
            location: Some("Portland, OR".to_string()),
            equity_eligible: false,
            first_generation: true,
            preferences,
        }
    }

    #[test]
    fn grade_derivation_from_graduation_year() {
        assert_eq!(calculate_grade(Some(2027), 2026), Some("11th".to_string()));
        assert_eq!(calculate_grade(Some(2026), 2026), Some("12th".to_string()));
        assert_eq!(calculate_grade(Some(2031), 2026), None);
        assert_eq!(calculate_grade(None, 2026), None);
    }

    #[test]
    fn equity_eligible_implies_high_need() {
        let mut u = user(json!({}));
        assert_eq!(map_user_profile(&u, 2026).characteristics.financial_need_level, None);

        u.equity_eligible = true;
        assert_eq!(
            map_user_profile(&u, 2026).characteristics.financial_need_level,
            Some(NeedLevel::High)
        );
    }

    #[test]
    fn preference_lookups_fall_back_to_legacy_keys() {
        let u = user(json!({
            "academicInterests": ["computer science", "biology"],
            "extracurriculars": ["debate"],
            "careerGoals": "engineer",
        }));
        let profile = map_user_profile(&u, 2026);

        assert_eq!(
            profile.preferences.major_interests,
            vec!["computer science", "biology"]
        );
        assert_eq!(profile.preferences.activity_preferences, vec!["debate"]);
        assert_eq!(profile.goals.career_aspirations, vec!["engineer"]);
    }

    #[test]
    fn primary_key_wins_over_legacy() {
        let u = user(json!({
            "majors": ["physics"],
            "academicInterests": ["history"],
        }));
        let profile = map_user_profile(&u, 2026);
        assert_eq!(profile.preferences.major_interests, vec!["physics"]);
    }

    #[test]
    fn absent_and_malformed_keys_yield_empty_lists() {
        let u = user(json!({"majors": 42, "values": {"a": 1}}));
        let profile = map_user_profile(&u, 2026);

        assert!(profile.preferences.major_interests.is_empty());
        assert!(profile.preferences.cultural_values.is_empty());
        assert!(profile.goals.impact_areas.is_empty());
    }

    #[test]
    fn personality_traits_keep_numeric_entries_only() {
        let u = user(json!({
            "personalityTraits": {"openness": 0.8, "label": "high"}
        }));
        let profile = map_user_profile(&u, 2026);

        assert_eq!(
            profile.characteristics.personality_traits.get("openness"),
            Some(&0.8)
        );
        assert!(!profile.characteristics.personality_traits.contains_key("label"));
    }
}
