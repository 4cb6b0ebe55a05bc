use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

/// Deepest nesting accepted for a criterion tree
pub const MAX_CRITERION_DEPTH: usize = 8;

const EQ_EPSILON: f64 = 1e-9;

/// Facts about a user that criteria can test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeContext {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub active_days: u32,
    pub total_practice_seconds: u64,
    pub total_words: u64,
    pub best_daily_wpm: f64,
    pub average_accuracy: f64,
    pub today_wpm: f64,
    pub today_accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeField {
    CurrentStreak,
    LongestStreak,
    ActiveDays,
    TotalPracticeMinutes,
    TotalWords,
    BestDailyWpm,
    AverageAccuracy,
    TodayWpm,
    TodayAccuracy,
}

impl BadgeField {
    fn read(&self, context: &BadgeContext) -> f64 {
        match self {
            BadgeField::CurrentStreak => f64::from(context.current_streak),
            BadgeField::LongestStreak => f64::from(context.longest_streak),
            BadgeField::ActiveDays => f64::from(context.active_days),
            BadgeField::TotalPracticeMinutes => context.total_practice_seconds as f64 / 60.0,
            BadgeField::TotalWords => context.total_words as f64,
            BadgeField::BestDailyWpm => context.best_daily_wpm,
            BadgeField::AverageAccuracy => context.average_accuracy,
            BadgeField::TodayWpm => context.today_wpm,
            BadgeField::TodayAccuracy => context.today_accuracy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl CompareOp {
    fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::Gt => value > threshold,
            CompareOp::Gte => value >= threshold,
            CompareOp::Lt => value < threshold,
            CompareOp::Lte => value <= threshold,
            CompareOp::Eq => (value - threshold).abs() < EQ_EPSILON,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCriterion {
    Compare {
        field: BadgeField,
        operator: CompareOp,
        threshold: f64,
    },
    All {
        criteria: Vec<BadgeCriterion>,
    },
    Any {
        criteria: Vec<BadgeCriterion>,
    },
    Not {
        criterion: Box<BadgeCriterion>,
    },
}

impl BadgeCriterion {
    pub fn depth(&self) -> usize {
        match self {
            BadgeCriterion::Compare { .. } => 1,
            BadgeCriterion::All { criteria } | BadgeCriterion::Any { criteria } => {
                1 + criteria.iter().map(|c| c.depth()).max().unwrap_or(0)
            }
            BadgeCriterion::Not { criterion } => 1 + criterion.depth(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let depth = self.depth();
        if depth > MAX_CRITERION_DEPTH {
            return Err(DomainError::Validation(format!(
                "Badge criterion nested {} levels deep, limit is {}",
                depth, MAX_CRITERION_DEPTH
            )));
        }
        self.validate_node()
    }

    fn validate_node(&self) -> Result<(), DomainError> {
        match self {
            BadgeCriterion::Compare { threshold, .. } if !threshold.is_finite() => Err(
                DomainError::Validation("Badge threshold must be finite".to_string()),
            ),
            BadgeCriterion::Compare { .. } => Ok(()),
            BadgeCriterion::All { criteria } | BadgeCriterion::Any { criteria } => {
                if criteria.is_empty() {
                    return Err(DomainError::Validation(
                        "Badge criterion group cannot be empty".to_string(),
                    ));
                }
                criteria.iter().try_for_each(|c| c.validate_node())
            }
            BadgeCriterion::Not { criterion } => criterion.validate_node(),
        }
    }

    pub fn evaluate(&self, context: &BadgeContext) -> bool {
        match self {
            BadgeCriterion::Compare {
                field,
                operator,
                threshold,
            } => operator.holds(field.read(context), *threshold),
            BadgeCriterion::All { criteria } => criteria.iter().all(|c| c.evaluate(context)),
            BadgeCriterion::Any { criteria } => criteria.iter().any(|c| c.evaluate(context)),
            BadgeCriterion::Not { criterion } => !criterion.evaluate(context),
        }
    }
}
