use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{NewFreeze, StreakFreeze};
use crate::shared::{DomainError, UserId};

#[async_trait]
pub trait FreezeRepository: Send {
    /// Persist a newly granted freeze and return it with its assigned id
    async fn insert_freeze(&mut self, freeze: &NewFreeze) -> Result<StreakFreeze, DomainError>;

    async fn find_freeze(&mut self, id: i64) -> Result<Option<StreakFreeze>, DomainError>;

    /// All freezes of a user, newest first
    async fn list_freezes(&mut self, user_id: &UserId) -> Result<Vec<StreakFreeze>, DomainError>;

    /// Freezes still marked available (possibly past expiry), oldest first
    async fn list_available_freezes(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<StreakFreeze>, DomainError>;

    async fn update_freeze(&mut self, freeze: &StreakFreeze) -> Result<(), DomainError>;

    /// Mark every available freeze past its expiry as expired and return them
    async fn expire_stale_freezes(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<StreakFreeze>, DomainError>;
}
