use async_trait::async_trait;

use super::{RewardCatalog, RewardDefinition, SurpriseRoll};
use crate::shared::{DomainError, UserId};

#[async_trait]
pub trait RewardCatalogRepository: Send {
    /// Full milestone table of a variant
    async fn load_catalog(&mut self, variant: &str) -> Result<RewardCatalog, DomainError>;

    /// Upsert keyed by (variant, milestone, surprise flag)
    async fn save_reward(&mut self, definition: &RewardDefinition) -> Result<(), DomainError>;

    async fn count_rewards(&mut self) -> Result<u64, DomainError>;
}

#[async_trait]
pub trait SurpriseRollRepository: Send {
    /// Most recent roll for a milestone on any day; a milestone is normally rolled once
    async fn find_latest_roll(
        &mut self,
        user_id: &UserId,
        milestone: u32,
    ) -> Result<Option<SurpriseRoll>, DomainError>;

    /// Insert unless a roll for (user, day, milestone) exists; returns whether it was written
    async fn insert_roll(&mut self, roll: &SurpriseRoll) -> Result<bool, DomainError>;
}
