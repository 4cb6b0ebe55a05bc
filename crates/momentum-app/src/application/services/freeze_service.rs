use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use super::streak_service::load_streak;
use super::transaction::{finish, with_conflict_retry};
use momentum_domain::freeze::{FreezePolicy, FreezeSource, StreakFreeze};
use momentum_domain::shared::{Clock, DomainError, UserId};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};
use momentum_domain::streak::StreakState;

/// A freeze applied ahead of practice, and the streak it protects
#[derive(Debug, Clone)]
pub struct FreezeUsage {
    pub freeze: StreakFreeze,
    pub protected_streak: u32,
    pub streak: StreakState,
}

/// Expire the user's stale freezes and resync `freeze_count`.
/// Returns the usable freezes, oldest first.
pub(crate) async fn reconcile_freezes(
    tx: &mut dyn EngagementTransaction,
    state: &mut StreakState,
    now: DateTime<Utc>,
) -> Result<Vec<StreakFreeze>, DomainError> {
    let mut usable = Vec::new();
    for mut freeze in tx.list_available_freezes(state.user_id()).await? {
        if freeze.is_past_expiry(now) {
            freeze.mark_expired();
            tx.update_freeze(&freeze).await?;
            info!(
                "[freeze] Freeze {} of {} expired",
                freeze.id(),
                state.user_id()
            );
        } else {
            usable.push(freeze);
        }
    }
    state.sync_freeze_count(usable.len() as u32);
    Ok(usable)
}

/// Grant up to `requested` freezes without exceeding the cap.
/// Returns how many were granted; the caller saves `state`.
pub(crate) async fn grant_capped(
    tx: &mut dyn EngagementTransaction,
    policy: &FreezePolicy,
    state: &mut StreakState,
    source: FreezeSource,
    requested: u32,
    now: DateTime<Utc>,
) -> Result<u32, DomainError> {
    let available = reconcile_freezes(tx, state, now).await?.len() as u32;
    let granted = policy.grantable(available, requested);
    for _ in 0..granted {
        tx.insert_freeze(&policy.new_freeze(state.user_id().clone(), source, now))
            .await?;
    }
    state.sync_freeze_count(available + granted);
    Ok(granted)
}

/// Freeze manager: bounded pool of tokens that bridge one missed day
pub struct FreezeService {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    policy: FreezePolicy,
}

impl FreezeService {
    pub fn new(uow: Arc<dyn UnitOfWork>, clock: Arc<dyn Clock>, policy: FreezePolicy) -> Self {
        Self { uow, clock, policy }
    }

    pub fn policy(&self) -> &FreezePolicy {
        &self.policy
    }

    /// Grant a single freeze; rejected once the unused cap is reached
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn grant_freeze(
        &self,
        user_id: &UserId,
        source: FreezeSource,
    ) -> Result<StreakFreeze, DomainError> {
        with_conflict_retry("grant_freeze", || self.grant_once(user_id, source)).await
    }

    async fn grant_once(
        &self,
        user_id: &UserId,
        source: FreezeSource,
    ) -> Result<StreakFreeze, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let mut state = load_streak(tx.as_mut(), user_id, now).await?;
            let available = reconcile_freezes(tx.as_mut(), &mut state, now).await?.len() as u32;
            self.policy.check_grant(available)?;

            let freeze = tx
                .insert_freeze(&self.policy.new_freeze(user_id.clone(), source, now))
                .await?;
            state.sync_freeze_count(available + 1);
            tx.save_streak(&state).await?;

            info!(
                "[freeze] Granted freeze {} ({}) to {}, {} available",
                freeze.id(),
                source.as_str(),
                user_id,
                state.freeze_count()
            );
            Ok::<_, DomainError>(freeze)
        }
        .await;
        finish(tx, result).await
    }

    /// Spend a specific freeze on the day missed since the last activity
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn use_freeze(
        &self,
        user_id: &UserId,
        freeze_id: i64,
    ) -> Result<FreezeUsage, DomainError> {
        if freeze_id <= 0 {
            return Err(DomainError::InvalidFreezeId(freeze_id.to_string()));
        }
        with_conflict_retry("use_freeze", || self.use_once(user_id, freeze_id)).await
    }

    async fn use_once(&self, user_id: &UserId, freeze_id: i64) -> Result<FreezeUsage, DomainError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let mut tx = self.uow.begin().await?;
        let result = self
            .apply_freeze(tx.as_mut(), user_id, freeze_id, today, now)
            .await;

        match result {
            // Keep the lazily recorded expiries even though the request fails
            Err(DomainError::FreezeNotFoundOrExpired(id)) => {
                finish(tx, Ok(())).await?;
                Err(DomainError::FreezeNotFoundOrExpired(id))
            }
            other => finish(tx, other).await,
        }
    }

    async fn apply_freeze(
        &self,
        tx: &mut dyn EngagementTransaction,
        user_id: &UserId,
        freeze_id: i64,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<FreezeUsage, DomainError> {
        let mut state = load_streak(tx, user_id, now).await?;
        let usable = reconcile_freezes(tx, &mut state, now).await?;
        tx.save_streak(&state).await?;

        let mut freeze = usable
            .into_iter()
            .find(|f| f.id() == freeze_id)
            .ok_or(DomainError::FreezeNotFoundOrExpired(freeze_id))?;

        state.mark_freeze_pending(today, now)?;
        freeze.mark_used(now, today - Duration::days(1))?;
        tx.update_freeze(&freeze).await?;
        state.sync_freeze_count(state.freeze_count().saturating_sub(1));
        tx.save_streak(&state).await?;

        info!(
            "[freeze] {} applied freeze {} to protect a {}-day streak",
            user_id,
            freeze.id(),
            state.current_streak()
        );

        Ok(FreezeUsage {
            protected_streak: state.current_streak(),
            freeze,
            streak: state,
        })
    }

    /// Every freeze of the user, newest first, after lazy expiry
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn list_freezes(&self, user_id: &UserId) -> Result<Vec<StreakFreeze>, DomainError> {
        with_conflict_retry("list_freezes", || self.list_once(user_id)).await
    }

    async fn list_once(&self, user_id: &UserId) -> Result<Vec<StreakFreeze>, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let mut state = load_streak(tx.as_mut(), user_id, now).await?;
            reconcile_freezes(tx.as_mut(), &mut state, now).await?;
            tx.save_streak(&state).await?;
            tx.list_freezes(user_id).await
        }
        .await;
        finish(tx, result).await
    }
}
