use async_trait::async_trait;

use super::StreakState;
use crate::shared::{DomainError, UserId};

#[async_trait]
pub trait StreakRepository: Send {
    async fn find_streak(&mut self, user_id: &UserId) -> Result<Option<StreakState>, DomainError>;

    /// Upsert keyed by user id
    async fn save_streak(&mut self, state: &StreakState) -> Result<(), DomainError>;
}
