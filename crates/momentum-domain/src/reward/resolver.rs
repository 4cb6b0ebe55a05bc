use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{RewardCatalog, RewardDefinition, RewardKind, DEFAULT_MILESTONE_STEP};
use crate::shared::{RandomSource, UserId};

/// The next milestone a user is working towards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextReward {
    pub milestone: u32,
    pub days_remaining: u32,
    pub reward: RewardDefinition,
    /// True when the catalog had nothing left and a default badge was generated
    pub synthesized: bool,
}

impl NextReward {
    /// Smallest milestone strictly greater than `current_streak`. Past the end
    /// of the catalog a badge milestone is synthesized at the next multiple of
    /// `step`, so there is always a next reward.
    pub fn resolve(catalog: &RewardCatalog, current_streak: u32, step: u32) -> Self {
        if let Some(definition) = catalog.first_after(current_streak) {
            return Self {
                milestone: definition.milestone(),
                days_remaining: definition.milestone() - current_streak,
                reward: definition.clone(),
                synthesized: false,
            };
        }

        let step = if step == 0 { DEFAULT_MILESTONE_STEP } else { step };
        let milestone = (current_streak / step + 1) * step;
        Self {
            milestone,
            days_remaining: milestone - current_streak,
            reward: synthesized_badge(catalog.variant(), milestone),
            synthesized: true,
        }
    }
}

/// Definition a claim at `milestone` redeems: the configured entry, or the
/// synthesized badge for a step multiple lying past the end of the catalog
pub fn claimable_at(catalog: &RewardCatalog, milestone: u32, step: u32) -> Option<RewardDefinition> {
    if let Some(definition) = catalog.at(milestone) {
        return Some(definition.clone());
    }
    let step = if step == 0 { DEFAULT_MILESTONE_STEP } else { step };
    let past_end = catalog.first_after(milestone.saturating_sub(1)).is_none();
    (milestone > 0 && past_end && milestone % step == 0)
        .then(|| synthesized_badge(catalog.variant(), milestone))
}

fn synthesized_badge(variant: &str, milestone: u32) -> RewardDefinition {
    RewardDefinition::restore(
        variant.to_string(),
        milestone,
        RewardKind::Badge {
            badge_id: format!("streak_{}", milestone),
        },
        format!("{}-day streak badge", milestone),
        1.0,
        None,
    )
}

/// Observed outcome of a surprise roll; persisted so later reads replay it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurpriseRoll {
    user_id: UserId,
    roll_date: NaiveDate,
    milestone: u32,
    roll_value: f64,
    fired: bool,
    multiplier: Option<f64>,
    rolled_at: DateTime<Utc>,
}

impl SurpriseRoll {
    /// Draw `u` in [0, 1); the surprise fires when `u <= probability`. A fired
    /// roll with a multiplier range draws a second value for the multiplier.
    pub fn roll(
        user_id: &UserId,
        roll_date: NaiveDate,
        definition: &RewardDefinition,
        rng: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Self {
        let roll_value = rng.next_f64();
        let fired = roll_value <= definition.probability();
        let multiplier = if fired {
            definition
                .multiplier_range()
                .map(|range| range.sample(rng.next_f64()))
        } else {
            None
        };

        Self {
            user_id: user_id.clone(),
            roll_date,
            milestone: definition.milestone(),
            roll_value,
            fired,
            multiplier,
            rolled_at: now,
        }
    }

    pub fn restore(
        user_id: UserId,
        roll_date: NaiveDate,
        milestone: u32,
        roll_value: f64,
        fired: bool,
        multiplier: Option<f64>,
        rolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            roll_date,
            milestone,
            roll_value,
            fired,
            multiplier,
            rolled_at,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn roll_date(&self) -> NaiveDate {
        self.roll_date
    }

    pub fn milestone(&self) -> u32 {
        self.milestone
    }

    pub fn roll_value(&self) -> f64 {
        self.roll_value
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    pub fn multiplier(&self) -> Option<f64> {
        self.multiplier
    }

    pub fn rolled_at(&self) -> DateTime<Utc> {
        self.rolled_at
    }
}

/// Reward shown on the day a milestone is reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DailyReward {
    Regular {
        definition: RewardDefinition,
    },
    Surprise {
        definition: RewardDefinition,
        multiplier: Option<f64>,
    },
}

impl DailyReward {
    /// A surprise only yields a reward when its roll fired
    pub fn from_roll(definition: &RewardDefinition, roll: &SurpriseRoll) -> Option<Self> {
        roll.fired().then(|| DailyReward::Surprise {
            definition: definition.clone(),
            multiplier: roll.multiplier(),
        })
    }

    pub fn definition(&self) -> &RewardDefinition {
        match self {
            DailyReward::Regular { definition } | DailyReward::Surprise { definition, .. } => {
                definition
            }
        }
    }

    pub fn effect_description(&self) -> String {
        match self {
            DailyReward::Regular { definition } => definition.description().to_string(),
            DailyReward::Surprise {
                definition,
                multiplier: Some(factor),
            } => format!("{} (x{:.2} points multiplier)", definition.description(), factor),
            DailyReward::Surprise {
                definition,
                multiplier: None,
            } => definition.description().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::MultiplierRange;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<f64>>);

    impl RandomSource for Scripted {
        fn next_f64(&self) -> f64 {
            self.0.lock().unwrap().remove(0)
        }
    }

    fn catalog() -> RewardCatalog {
        RewardCatalog::new(
            "control",
            vec![
                RewardDefinition::regular("control", 3, RewardKind::Points { amount: 20 }, "+20")
                    .unwrap(),
                RewardDefinition::regular("control", 10, RewardKind::Points { amount: 50 }, "+50")
                    .unwrap(),
            ],
        )
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()
    }

    #[test]
    fn test_claimable_at_covers_synthesized_milestones_only_past_the_end() {
        let catalog = catalog();
        assert_eq!(
            claimable_at(&catalog, 3, 5).unwrap().kind(),
            &RewardKind::Points { amount: 20 }
        );
        // Inside the configured range nothing is synthesized
        assert!(claimable_at(&catalog, 5, 5).is_none());
        assert!(claimable_at(&catalog, 16, 5).is_none());
        assert_eq!(
            claimable_at(&catalog, 15, 5).unwrap().kind(),
            &RewardKind::Badge {
                badge_id: "streak_15".into()
            }
        );
    }

    #[test]
    fn test_next_reward_from_catalog() {
        let next = NextReward::resolve(&catalog(), 4, DEFAULT_MILESTONE_STEP);
        assert_eq!(next.milestone, 10);
        assert_eq!(next.days_remaining, 6);
        assert!(!next.synthesized);
    }

    #[test]
    fn test_next_reward_is_strictly_greater() {
        let next = NextReward::resolve(&catalog(), 3, DEFAULT_MILESTONE_STEP);
        assert_eq!(next.milestone, 10);
    }

    #[test]
    fn test_next_reward_synthesized_past_catalog() {
        let next = NextReward::resolve(&catalog(), 12, DEFAULT_MILESTONE_STEP);
        assert_eq!(next.milestone, 15);
        assert!(next.synthesized);
        assert_eq!(
            next.reward.kind(),
            &RewardKind::Badge {
                badge_id: "streak_15".into()
            }
        );

        let on_boundary = NextReward::resolve(&catalog(), 15, DEFAULT_MILESTONE_STEP);
        assert_eq!(on_boundary.milestone, 20);

        let empty = RewardCatalog::new("control", vec![]);
        assert_eq!(NextReward::resolve(&empty, 0, 5).milestone, 5);
    }

    #[test]
    fn test_roll_fires_with_multiplier() {
        let def = RewardDefinition::surprise(
            "control",
            7,
            "Mystery bonus",
            0.3,
            Some(MultiplierRange::new(1.5, 2.5).unwrap()),
        )
        .unwrap();
        let rng = Scripted(Mutex::new(vec![0.3, 0.5]));
        let roll = SurpriseRoll::roll(&UserId::from_string("u"), day(), &def, &rng, Utc::now());

        assert!(roll.fired());
        assert_eq!(roll.multiplier(), Some(2.0));
        let reward = DailyReward::from_roll(&def, &roll).unwrap();
        assert_eq!(
            reward.effect_description(),
            "Mystery bonus (x2.00 points multiplier)"
        );
    }

    #[test]
    fn test_roll_miss_yields_no_reward() {
        let def = RewardDefinition::surprise("control", 7, "Mystery", 0.3, None).unwrap();
        let rng = Scripted(Mutex::new(vec![0.31]));
        let roll = SurpriseRoll::roll(&UserId::from_string("u"), day(), &def, &rng, Utc::now());

        assert!(!roll.fired());
        assert!(roll.multiplier().is_none());
        assert!(DailyReward::from_roll(&def, &roll).is_none());
    }
}
