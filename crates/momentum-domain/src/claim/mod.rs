mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::UserId;

pub use repository::ClaimRepository;

/// Effect applied by a successful claim, as reported back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppliedEffect {
    Points {
        amount: i64,
        /// Active multiplier the base amount was scaled by
        #[serde(default, skip_serializing_if = "Option::is_none")]
        multiplier: Option<f64>,
    },
    Badge {
        badge_id: String,
        newly_earned: bool,
    },
    FreezeGrant {
        requested: u32,
        granted: u32,
        /// Part of the grant was dropped because of the unused-freeze cap
        capped: bool,
    },
    ThemeUnlock {
        theme_id: String,
        newly_unlocked: bool,
    },
    Multiplier {
        factor: f64,
        expires_at: DateTime<Utc>,
    },
}

impl AppliedEffect {
    pub fn type_name(&self) -> &'static str {
        match self {
            AppliedEffect::Points { .. } => "points",
            AppliedEffect::Badge { .. } => "badge",
            AppliedEffect::FreezeGrant { .. } => "freeze_grant",
            AppliedEffect::ThemeUnlock { .. } => "theme_unlock",
            AppliedEffect::Multiplier { .. } => "multiplier",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AppliedEffect::Points { amount, .. } => format!("+{} points", amount),
            AppliedEffect::Badge { badge_id, .. } => format!("Badge '{}'", badge_id),
            AppliedEffect::FreezeGrant {
                requested,
                granted,
                capped: true,
            } => format!(
                "{} of {} streak freezes granted (freeze limit reached)",
                granted, requested
            ),
            AppliedEffect::FreezeGrant { granted, .. } => {
                format!("{} streak freeze(s) granted", granted)
            }
            AppliedEffect::ThemeUnlock { theme_id, .. } => format!("Theme '{}' unlocked", theme_id),
            AppliedEffect::Multiplier { factor, expires_at } => format!(
                "x{:.2} points multiplier until {}",
                factor,
                expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }
}

/// Durable proof that a user redeemed a milestone; unique per (user, milestone)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    id: Uuid,
    user_id: UserId,
    milestone: u32,
    variant: String,
    reward_type: String,
    applied_effect: AppliedEffect,
    claimed_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn new(
        user_id: UserId,
        milestone: u32,
        variant: &str,
        reward_type: &str,
        applied_effect: AppliedEffect,
        claimed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            milestone,
            variant: variant.to_string(),
            reward_type: reward_type.to_string(),
            applied_effect,
            claimed_at,
        }
    }

    pub fn restore(
        id: Uuid,
        user_id: UserId,
        milestone: u32,
        variant: String,
        reward_type: String,
        applied_effect: AppliedEffect,
        claimed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            milestone,
            variant,
            reward_type,
            applied_effect,
            claimed_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn milestone(&self) -> u32 {
        self.milestone
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn reward_type(&self) -> &str {
        &self.reward_type
    }

    pub fn applied_effect(&self) -> &AppliedEffect {
        &self.applied_effect
    }

    pub fn claimed_at(&self) -> DateTime<Utc> {
        self.claimed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_effect_serializes_flat() {
        let effect = AppliedEffect::Points {
            amount: 50,
            multiplier: None,
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json, serde_json::json!({"type": "points", "amount": 50}));
    }

    #[test]
    fn test_effect_round_trips_through_json_column() {
        let effect = AppliedEffect::FreezeGrant {
            requested: 2,
            granted: 1,
            capped: true,
        };
        let raw = serde_json::to_string(&effect).unwrap();
        let back: AppliedEffect = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, effect);
        assert!(back.describe().contains("1 of 2"));
    }
}
