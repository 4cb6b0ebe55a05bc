use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{EarnedBadge, PointBalance, PointMultiplier, UnlockedTheme};
use crate::shared::{DomainError, UserId};

/// Points, badges, themes and multipliers a user holds
#[async_trait]
pub trait LedgerRepository: Send {
    async fn find_balance(&mut self, user_id: &UserId)
        -> Result<Option<PointBalance>, DomainError>;

    async fn save_balance(&mut self, balance: &PointBalance) -> Result<(), DomainError>;

    /// Returns false when the user already holds the badge
    async fn insert_badge_if_absent(&mut self, badge: &EarnedBadge) -> Result<bool, DomainError>;

    /// Oldest first
    async fn list_badges(&mut self, user_id: &UserId) -> Result<Vec<EarnedBadge>, DomainError>;

    /// Returns false when the theme was already unlocked
    async fn insert_theme_if_absent(&mut self, theme: &UnlockedTheme)
        -> Result<bool, DomainError>;

    async fn list_themes(&mut self, user_id: &UserId) -> Result<Vec<UnlockedTheme>, DomainError>;

    async fn insert_multiplier(&mut self, multiplier: &PointMultiplier)
        -> Result<(), DomainError>;

    async fn active_multipliers(
        &mut self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PointMultiplier>, DomainError>;
}
