//! Achievement badges described by a fixed predicate language.

mod criterion;

use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

pub use criterion::{BadgeContext, BadgeCriterion, BadgeField, CompareOp, MAX_CRITERION_DEPTH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    badge_id: String,
    name: String,
    description: String,
    criterion: BadgeCriterion,
}

impl BadgeDefinition {
    pub fn new(
        badge_id: &str,
        name: &str,
        description: &str,
        criterion: BadgeCriterion,
    ) -> Result<Self, DomainError> {
        if badge_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "Badge id cannot be empty".to_string(),
            ));
        }
        criterion.validate()?;
        Ok(Self {
            badge_id: badge_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            criterion,
        })
    }

    /// Parse a definition from JSON, enforcing the criterion depth limit
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let parsed: BadgeDefinition = serde_json::from_str(raw)
            .map_err(|e| DomainError::Serialization(format!("Invalid badge definition: {}", e)))?;
        Self::new(
            &parsed.badge_id,
            &parsed.name,
            &parsed.description,
            parsed.criterion,
        )
    }

    pub fn badge_id(&self) -> &str {
        &self.badge_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn criterion(&self) -> &BadgeCriterion {
        &self.criterion
    }

    pub fn is_earned(&self, context: &BadgeContext) -> bool {
        self.criterion.evaluate(context)
    }
}

/// Badges every deployment ships with
pub fn builtin_badges() -> Vec<BadgeDefinition> {
    use BadgeCriterion::{All, Compare, Not};

    let at_least = |field: BadgeField, threshold: f64| Compare {
        field,
        operator: CompareOp::Gte,
        threshold,
    };

    vec![
        BadgeDefinition {
            badge_id: "first_steps".to_string(),
            name: "First Steps".to_string(),
            description: "Complete your first practice day".to_string(),
            criterion: at_least(BadgeField::ActiveDays, 1.0),
        },
        BadgeDefinition {
            badge_id: "week_warrior".to_string(),
            name: "Week Warrior".to_string(),
            description: "Practice seven days in a row".to_string(),
            criterion: at_least(BadgeField::CurrentStreak, 7.0),
        },
        BadgeDefinition {
            badge_id: "speed_demon".to_string(),
            name: "Speed Demon".to_string(),
            description: "Average 60 WPM in a day with at least 95% accuracy".to_string(),
            criterion: All {
                criteria: vec![
                    at_least(BadgeField::TodayWpm, 60.0),
                    at_least(BadgeField::TodayAccuracy, 95.0),
                ],
            },
        },
        BadgeDefinition {
            badge_id: "marathoner".to_string(),
            name: "Marathoner".to_string(),
            description: "Practice for ten hours in total".to_string(),
            criterion: at_least(BadgeField::TotalPracticeMinutes, 600.0),
        },
        BadgeDefinition {
            badge_id: "wordsmith".to_string(),
            name: "Wordsmith".to_string(),
            description: "Type 10,000 words".to_string(),
            criterion: at_least(BadgeField::TotalWords, 10_000.0),
        },
        BadgeDefinition {
            badge_id: "comeback".to_string(),
            name: "Comeback".to_string(),
            description: "Start over after losing a streak of a week or more".to_string(),
            criterion: All {
                criteria: vec![
                    at_least(BadgeField::LongestStreak, 7.0),
                    Not {
                        criterion: Box::new(Compare {
                            field: BadgeField::CurrentStreak,
                            operator: CompareOp::Gt,
                            threshold: 1.0,
                        }),
                    },
                ],
            },
        },
    ]
}

/// Ids of definitions satisfied by `context` and not yet held
pub fn newly_earned<'a>(
    definitions: &'a [BadgeDefinition],
    context: &BadgeContext,
    held: &[String],
) -> Vec<&'a BadgeDefinition> {
    definitions
        .iter()
        .filter(|d| !held.iter().any(|h| h == d.badge_id()))
        .filter(|d| d.is_earned(context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_badges_are_valid() {
        for badge in builtin_badges() {
            assert!(badge.criterion().validate().is_ok(), "{}", badge.badge_id());
        }
    }

    #[test]
    fn test_newly_earned_skips_held_badges() {
        let defs = builtin_badges();
        let context = BadgeContext {
            current_streak: 7,
            longest_streak: 7,
            active_days: 7,
            ..BadgeContext::default()
        };
        let held = vec!["first_steps".to_string()];

        let ids: Vec<&str> = newly_earned(&defs, &context, &held)
            .into_iter()
            .map(|d| d.badge_id())
            .collect();
        assert_eq!(ids, vec!["week_warrior"]);
    }

    #[test]
    fn test_comeback_requires_reset_after_long_streak() {
        let comeback = builtin_badges()
            .into_iter()
            .find(|b| b.badge_id() == "comeback")
            .unwrap();
        let mut context = BadgeContext {
            current_streak: 1,
            longest_streak: 9,
            ..BadgeContext::default()
        };
        assert!(comeback.is_earned(&context));
        context.current_streak = 2;
        assert!(!comeback.is_earned(&context));
    }

    #[test]
    fn test_from_json_parses_tagged_tree() {
        let raw = r#"{
            "badge_id": "night_shift",
            "name": "Night Shift",
            "description": "Long and accurate",
            "criterion": {
                "type": "any",
                "criteria": [
                    {"type": "compare", "field": "total_words", "operator": "gte", "threshold": 500},
                    {"type": "compare", "field": "best_daily_wpm", "operator": "gt", "threshold": 80}
                ]
            }
        }"#;
        let def = BadgeDefinition::from_json(raw).unwrap();
        assert_eq!(def.badge_id(), "night_shift");
        assert!(def.is_earned(&BadgeContext {
            total_words: 600,
            ..BadgeContext::default()
        }));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(
            BadgeDefinition::from_json("{\"badge_id\": 3}"),
            Err(DomainError::Serialization(_))
        ));
    }
}
