use async_trait::async_trait;

use crate::activity::ActivityLogRepository;
use crate::analytics::AnalyticsRepository;
use crate::claim::ClaimRepository;
use crate::experiment::ExperimentRepository;
use crate::freeze::FreezeRepository;
use crate::ledger::LedgerRepository;
use crate::reward::{RewardCatalogRepository, SurpriseRollRepository};
use crate::shared::{DomainError, TransactionContext};
use crate::streak::StreakRepository;

/// One open store transaction exposing every repository.
/// Nothing written through it is visible to others until `commit`.
pub trait EngagementTransaction:
    TransactionContext
    + ActivityLogRepository
    + StreakRepository
    + FreezeRepository
    + ExperimentRepository
    + RewardCatalogRepository
    + SurpriseRollRepository
    + ClaimRepository
    + LedgerRepository
    + AnalyticsRepository
{
}

impl<T> EngagementTransaction for T where
    T: TransactionContext
        + ActivityLogRepository
        + StreakRepository
        + FreezeRepository
        + ExperimentRepository
        + RewardCatalogRepository
        + SurpriseRollRepository
        + ClaimRepository
        + LedgerRepository
        + AnalyticsRepository
{
}

/// Store port handed to the application layer
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn EngagementTransaction>, DomainError>;
}
