use async_trait::async_trait;

use super::ClaimRecord;
use crate::shared::{DomainError, UserId};

#[async_trait]
pub trait ClaimRepository: Send {
    async fn find_claim(
        &mut self,
        user_id: &UserId,
        milestone: u32,
    ) -> Result<Option<ClaimRecord>, DomainError>;

    /// Fails with `AlreadyClaimed` when (user, milestone) already exists
    async fn insert_claim(&mut self, claim: &ClaimRecord) -> Result<(), DomainError>;

    /// Newest first
    async fn list_claims(
        &mut self,
        user_id: &UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ClaimRecord>, DomainError>;

    async fn count_claims(&mut self, user_id: &UserId) -> Result<u64, DomainError>;

    async fn claimed_milestones(&mut self, user_id: &UserId) -> Result<Vec<u32>, DomainError>;
}
