mod repository;
pub mod resolver;
pub mod surprise;

use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

pub use repository::{RewardCatalogRepository, SurpriseRollRepository};
pub use resolver::{claimable_at, DailyReward, NextReward, SurpriseRoll};
pub use surprise::{SurpriseEffect, SurprisePolicy};

/// Step used when synthesizing a milestone past the end of a catalog
pub const DEFAULT_MILESTONE_STEP: u32 = 5;

/// What a milestone pays out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardKind {
    Points { amount: i64 },
    Badge { badge_id: String },
    FreezeGrant { count: u32 },
    ThemeUnlock { theme_id: String },
    Surprise,
}

impl RewardKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            RewardKind::Points { .. } => "points",
            RewardKind::Badge { .. } => "badge",
            RewardKind::FreezeGrant { .. } => "freeze_grant",
            RewardKind::ThemeUnlock { .. } => "theme_unlock",
            RewardKind::Surprise => "surprise",
        }
    }

    /// Flat value column used by the catalog table
    pub fn value(&self) -> String {
        match self {
            RewardKind::Points { amount } => amount.to_string(),
            RewardKind::Badge { badge_id } => badge_id.clone(),
            RewardKind::FreezeGrant { count } => count.to_string(),
            RewardKind::ThemeUnlock { theme_id } => theme_id.clone(),
            RewardKind::Surprise => String::new(),
        }
    }

    pub fn from_parts(type_name: &str, value: &str) -> Result<Self, DomainError> {
        let invalid = |what: &str| {
            DomainError::DataIntegrity(format!(
                "Invalid {} value '{}' for reward type '{}'",
                what, value, type_name
            ))
        };

        match type_name {
            "points" => {
                let amount: i64 = value.parse().map_err(|_| invalid("points"))?;
                if amount <= 0 {
                    return Err(invalid("points"));
                }
                Ok(RewardKind::Points { amount })
            }
            "badge" if !value.is_empty() => Ok(RewardKind::Badge {
                badge_id: value.to_string(),
            }),
            "freeze_grant" => {
                let count: u32 = value.parse().map_err(|_| invalid("freeze count"))?;
                if count == 0 {
                    return Err(invalid("freeze count"));
                }
                Ok(RewardKind::FreezeGrant { count })
            }
            "theme_unlock" if !value.is_empty() => Ok(RewardKind::ThemeUnlock {
                theme_id: value.to_string(),
            }),
            "surprise" => Ok(RewardKind::Surprise),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown reward type '{}' (value '{}')",
                other, value
            ))),
        }
    }
}

/// Bounds of a surprise multiplier draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRange {
    min: f64,
    max: f64,
}

impl MultiplierRange {
    pub fn new(min: f64, max: f64) -> Result<Self, DomainError> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(DomainError::Validation(format!(
                "Invalid multiplier range {}..{}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// `min + u * (max - min)` for a uniform `u` in [0, 1)
    pub fn sample(&self, u: f64) -> f64 {
        self.min + u * (self.max - self.min)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// One catalog row: the reward a variant grants at a milestone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardDefinition {
    variant: String,
    milestone: u32,
    kind: RewardKind,
    description: String,
    probability: f64,
    multiplier_range: Option<MultiplierRange>,
}

impl RewardDefinition {
    /// Deterministic milestone reward
    pub fn regular(
        variant: &str,
        milestone: u32,
        kind: RewardKind,
        description: &str,
    ) -> Result<Self, DomainError> {
        if kind == RewardKind::Surprise {
            return Err(DomainError::Validation(
                "Use RewardDefinition::surprise for surprise rewards".to_string(),
            ));
        }
        Self::validate_common(variant, milestone)?;
        Ok(Self {
            variant: variant.to_string(),
            milestone,
            kind,
            description: description.to_string(),
            probability: 1.0,
            multiplier_range: None,
        })
    }

    /// Probabilistic reward rolled when the streak lands on the milestone
    pub fn surprise(
        variant: &str,
        milestone: u32,
        description: &str,
        probability: f64,
        multiplier_range: Option<MultiplierRange>,
    ) -> Result<Self, DomainError> {
        Self::validate_common(variant, milestone)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(DomainError::Validation(format!(
                "Surprise probability must be within [0, 1], got {}",
                probability
            )));
        }
        Ok(Self {
            variant: variant.to_string(),
            milestone,
            kind: RewardKind::Surprise,
            description: description.to_string(),
            probability,
            multiplier_range,
        })
    }

    pub fn restore(
        variant: String,
        milestone: u32,
        kind: RewardKind,
        description: String,
        probability: f64,
        multiplier_range: Option<MultiplierRange>,
    ) -> Self {
        Self {
            variant,
            milestone,
            kind,
            description,
            probability,
            multiplier_range,
        }
    }

    fn validate_common(variant: &str, milestone: u32) -> Result<(), DomainError> {
        if variant.trim().is_empty() {
            return Err(DomainError::Validation(
                "Reward variant cannot be empty".to_string(),
            ));
        }
        if milestone == 0 {
            return Err(DomainError::Validation(
                "Reward milestone must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn milestone(&self) -> u32 {
        self.milestone
    }

    pub fn kind(&self) -> &RewardKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_surprise(&self) -> bool {
        self.kind == RewardKind::Surprise
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn multiplier_range(&self) -> Option<MultiplierRange> {
        self.multiplier_range
    }
}

/// Ordered milestone table of one variant, split into regular and surprise entries
#[derive(Debug, Clone, PartialEq)]
pub struct RewardCatalog {
    variant: String,
    regular: Vec<RewardDefinition>,
    surprise: Vec<RewardDefinition>,
}

impl RewardCatalog {
    pub fn new(variant: &str, definitions: Vec<RewardDefinition>) -> Self {
        let (mut surprise, mut regular): (Vec<_>, Vec<_>) = definitions
            .into_iter()
            .filter(|d| d.variant() == variant)
            .partition(|d| d.is_surprise());
        regular.sort_by_key(|d| d.milestone());
        surprise.sort_by_key(|d| d.milestone());

        Self {
            variant: variant.to_string(),
            regular,
            surprise,
        }
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.surprise.is_empty()
    }

    pub fn regular_at(&self, milestone: u32) -> Option<&RewardDefinition> {
        self.regular.iter().find(|d| d.milestone() == milestone)
    }

    pub fn surprise_at(&self, milestone: u32) -> Option<&RewardDefinition> {
        self.surprise.iter().find(|d| d.milestone() == milestone)
    }

    /// Claimable entry at a milestone, preferring the regular one
    pub fn at(&self, milestone: u32) -> Option<&RewardDefinition> {
        self.regular_at(milestone)
            .or_else(|| self.surprise_at(milestone))
    }

    /// Smallest configured milestone strictly above `streak`
    pub fn first_after(&self, streak: u32) -> Option<&RewardDefinition> {
        let regular = self.regular.iter().find(|d| d.milestone() > streak);
        let surprise = self.surprise.iter().find(|d| d.milestone() > streak);
        match (regular, surprise) {
            (Some(r), Some(s)) if s.milestone() < r.milestone() => Some(s),
            (Some(r), _) => Some(r),
            (None, s) => s,
        }
    }

    /// Every entry ordered by milestone, regular before surprise on ties
    pub fn entries(&self) -> Vec<&RewardDefinition> {
        let mut all: Vec<&RewardDefinition> =
            self.regular.iter().chain(self.surprise.iter()).collect();
        all.sort_by_key(|d| (d.milestone(), d.is_surprise()));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(variant: &str, milestone: u32, amount: i64) -> RewardDefinition {
        RewardDefinition::regular(
            variant,
            milestone,
            RewardKind::Points { amount },
            "points",
        )
        .unwrap()
    }

    #[test]
    fn test_kind_round_trips_through_columns() {
        let kinds = vec![
            RewardKind::Points { amount: 50 },
            RewardKind::Badge {
                badge_id: "week_warrior".into(),
            },
            RewardKind::FreezeGrant { count: 2 },
            RewardKind::ThemeUnlock {
                theme_id: "ocean".into(),
            },
            RewardKind::Surprise,
        ];
        for kind in kinds {
            let parsed = RewardKind::from_parts(kind.type_name(), &kind.value()).unwrap();
            assert_eq!(parsed, kind);
        }
        assert!(RewardKind::from_parts("points", "-5").is_err());
        assert!(RewardKind::from_parts("confetti", "1").is_err());
    }

    #[test]
    fn test_catalog_orders_and_filters_by_variant() {
        let catalog = RewardCatalog::new(
            "control",
            vec![
                points("control", 10, 50),
                points("variant_a", 3, 10),
                points("control", 3, 20),
                RewardDefinition::surprise("control", 7, "mystery", 0.5, None).unwrap(),
            ],
        );

        let milestones: Vec<u32> = catalog.entries().iter().map(|d| d.milestone()).collect();
        assert_eq!(milestones, vec![3, 7, 10]);
        assert!(catalog.regular_at(7).is_none());
        assert!(catalog.surprise_at(7).is_some());
        assert_eq!(catalog.first_after(3).unwrap().milestone(), 7);
        assert_eq!(catalog.first_after(7).unwrap().milestone(), 10);
        assert!(catalog.first_after(10).is_none());
    }

    #[test]
    fn test_regular_preferred_on_shared_milestone() {
        let catalog = RewardCatalog::new(
            "control",
            vec![
                RewardDefinition::surprise("control", 5, "mystery", 0.2, None).unwrap(),
                points("control", 5, 25),
            ],
        );
        assert!(!catalog.at(5).unwrap().is_surprise());
        assert!(!catalog.first_after(0).unwrap().is_surprise());
    }

    #[test]
    fn test_definition_validation() {
        assert!(RewardDefinition::regular("control", 0, RewardKind::Points { amount: 1 }, "x").is_err());
        assert!(RewardDefinition::regular("control", 1, RewardKind::Surprise, "x").is_err());
        assert!(RewardDefinition::surprise("control", 1, "x", 1.5, None).is_err());
        assert!(MultiplierRange::new(2.0, 1.5).is_err());
        assert_eq!(MultiplierRange::new(1.5, 3.0).unwrap().sample(0.5), 2.25);
    }
}
