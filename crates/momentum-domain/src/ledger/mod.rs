mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, UserId};

pub use repository::LedgerRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBalance {
    user_id: UserId,
    balance: i64,
    updated_at: DateTime<Utc>,
}

impl PointBalance {
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: 0,
            updated_at: now,
        }
    }

    pub fn restore(
        user_id: UserId,
        balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if balance < 0 {
            return Err(DomainError::DataIntegrity(format!(
                "Negative point balance {} for user {}",
                balance, user_id
            )));
        }
        Ok(Self {
            user_id,
            balance,
            updated_at,
        })
    }

    pub fn credit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::Validation(format!(
                "Credited points must be positive, got {}",
                amount
            )));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| DomainError::Validation("Point balance overflow".to_string()))?;
        self.updated_at = now;
        Ok(())
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Where an earned badge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeOrigin {
    Milestone,
    Achievement,
    Surprise,
}

impl BadgeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeOrigin::Milestone => "milestone",
            BadgeOrigin::Achievement => "achievement",
            BadgeOrigin::Surprise => "surprise",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "milestone" => Ok(BadgeOrigin::Milestone),
            "achievement" => Ok(BadgeOrigin::Achievement),
            "surprise" => Ok(BadgeOrigin::Surprise),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown badge origin '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub user_id: UserId,
    pub badge_id: String,
    pub origin: BadgeOrigin,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedTheme {
    pub user_id: UserId,
    pub theme_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Time-boxed scaling of points earned from claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMultiplier {
    pub user_id: UserId,
    pub factor: f64,
    pub source: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PointMultiplier {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.granted_at <= now && now < self.expires_at
    }

    /// Scale a base amount, never below the base
    pub fn apply(&self, base: i64) -> i64 {
        let scaled = (base as f64 * self.factor).round() as i64;
        scaled.max(base)
    }
}

/// Highest-factor multiplier active at `now`
pub fn strongest_multiplier(
    multipliers: &[PointMultiplier],
    now: DateTime<Utc>,
) -> Option<&PointMultiplier> {
    multipliers
        .iter()
        .filter(|m| m.is_active(now))
        .max_by(|a, b| a.factor.total_cmp(&b.factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_credit_accumulates_and_rejects_non_positive() {
        let now = Utc::now();
        let mut balance = PointBalance::empty(UserId::from_string("u"), now);
        balance.credit(50, now).unwrap();
        balance.credit(20, now).unwrap();
        assert_eq!(balance.balance(), 70);
        assert!(balance.credit(0, now).is_err());
        assert_eq!(balance.balance(), 70);
    }

    #[test]
    fn test_restore_rejects_negative_balance() {
        assert!(matches!(
            PointBalance::restore(UserId::from_string("u"), -1, Utc::now()),
            Err(DomainError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_strongest_active_multiplier() {
        let now = Utc::now();
        let make = |factor: f64, hours: i64| PointMultiplier {
            user_id: UserId::from_string("u"),
            factor,
            source: "surprise".into(),
            granted_at: now - Duration::hours(1),
            expires_at: now + Duration::hours(hours),
        };
        let multipliers = vec![make(1.5, 2), make(3.0, -1), make(2.0, 5)];

        let best = strongest_multiplier(&multipliers, now).unwrap();
        assert_eq!(best.factor, 2.0);
        assert_eq!(best.apply(50), 100);
        assert!(strongest_multiplier(&multipliers[1..2], now).is_none());
    }
}
