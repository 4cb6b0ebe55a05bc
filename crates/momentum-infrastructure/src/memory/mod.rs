//! Process-local store used by tests and single-process deployments.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the data; `commit` swaps the copy in, anything else
//! discards it.

mod repositories;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use momentum_domain::activity::DailyActivityRecord;
use momentum_domain::analytics::EngagementSnapshot;
use momentum_domain::claim::ClaimRecord;
use momentum_domain::experiment::{Experiment, ExperimentAssignment};
use momentum_domain::freeze::StreakFreeze;
use momentum_domain::ledger::{EarnedBadge, PointBalance, PointMultiplier, UnlockedTheme};
use momentum_domain::reward::{RewardDefinition, SurpriseRoll};
use momentum_domain::shared::{DomainError, TransactionContext, UserId};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};
use momentum_domain::streak::StreakState;

#[derive(Debug, Clone, Default)]
struct EngagementData {
    streaks: HashMap<UserId, StreakState>,
    activity: BTreeMap<(UserId, NaiveDate), DailyActivityRecord>,
    freezes: BTreeMap<i64, StreakFreeze>,
    last_freeze_id: i64,
    experiments: BTreeMap<String, Experiment>,
    assignments: Vec<ExperimentAssignment>,
    rewards: Vec<RewardDefinition>,
    rolls: Vec<SurpriseRoll>,
    claims: Vec<ClaimRecord>,
    balances: HashMap<UserId, PointBalance>,
    badges: Vec<EarnedBadge>,
    themes: Vec<UnlockedTheme>,
    multipliers: Vec<PointMultiplier>,
    snapshots: BTreeMap<NaiveDate, EngagementSnapshot>,
}

#[derive(Clone, Default)]
pub struct InMemoryUnitOfWork {
    data: Arc<Mutex<EngagementData>>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn EngagementTransaction>, DomainError> {
        let guard = self.data.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard: Some(guard),
            working,
        }))
    }
}

pub struct InMemoryTransaction {
    guard: Option<OwnedMutexGuard<EngagementData>>,
    working: EngagementData,
}

impl InMemoryTransaction {
    fn data(&mut self) -> Result<&mut EngagementData, DomainError> {
        if self.guard.is_none() {
            return Err(DomainError::Repository(
                "Transaction already finished".to_string(),
            ));
        }
        Ok(&mut self.working)
    }
}

#[async_trait]
impl TransactionContext for InMemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        let mut guard = self.guard.take().ok_or_else(|| {
            DomainError::Repository("Transaction already finished".to_string())
        })?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DomainError> {
        self.guard.take().map(drop).ok_or_else(|| {
            DomainError::Repository("Transaction already finished".to_string())
        })
    }
}
