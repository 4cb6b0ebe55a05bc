use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use super::freeze_service::reconcile_freezes;
use super::transaction::{finish, with_conflict_retry};
use momentum_domain::activity::{ActivityMetrics, DailyActivityRecord};
use momentum_domain::badge::{newly_earned, BadgeContext, BadgeDefinition};
use momentum_domain::freeze::StreakFreeze;
use momentum_domain::ledger::{BadgeOrigin, EarnedBadge};
use momentum_domain::shared::{Clock, DomainError, UserId};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};
use momentum_domain::streak::{StreakState, StreakTransition};

/// Longest range `get_activity_history` serves in one call
pub const MAX_HISTORY_DAYS: i64 = 366;

/// Everything one practice session changed
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub streak: StreakState,
    pub transition: StreakTransition,
    pub freeze_used: Option<StreakFreeze>,
    pub activity: DailyActivityRecord,
    pub new_badges: Vec<String>,
}

impl ActivityOutcome {
    pub fn freeze_bridged(&self) -> bool {
        matches!(self.transition, StreakTransition::Bridged { .. })
    }

    pub fn streak_reset(&self) -> bool {
        matches!(self.transition, StreakTransition::Reset { .. })
    }
}

/// Stored streak of a user, or a fresh one that is not yet persisted
pub(crate) async fn load_streak(
    tx: &mut dyn EngagementTransaction,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> Result<StreakState, DomainError> {
    Ok(tx
        .find_streak(user_id)
        .await?
        .unwrap_or_else(|| StreakState::new(user_id.clone(), now)))
}

/// Built-in achievement badges, with configured definitions replacing
/// built-ins of the same id
pub fn badge_set(custom: Vec<BadgeDefinition>) -> Vec<BadgeDefinition> {
    let mut badges: Vec<BadgeDefinition> = momentum_domain::badge::builtin_badges()
        .into_iter()
        .filter(|b| !custom.iter().any(|c| c.badge_id() == b.badge_id()))
        .collect();
    badges.extend(custom);
    badges
}

/// Streak tracker: turns practice sessions into streak transitions
pub struct StreakService {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    badges: Arc<Vec<BadgeDefinition>>,
}

impl StreakService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        badges: Vec<BadgeDefinition>,
    ) -> Self {
        Self {
            uow,
            clock,
            badges: Arc::new(badges),
        }
    }

    /// Current streak; creates the record on first access
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_streak(&self, user_id: &UserId) -> Result<StreakState, DomainError> {
        with_conflict_retry("get_streak", || self.get_streak_once(user_id)).await
    }

    async fn get_streak_once(&self, user_id: &UserId) -> Result<StreakState, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let mut state = load_streak(tx.as_mut(), user_id, now).await?;
            reconcile_freezes(tx.as_mut(), &mut state, now).await?;
            tx.save_streak(&state).await?;
            Ok::<_, DomainError>(state)
        }
        .await;
        finish(tx, result).await
    }

    #[instrument(skip(self, metrics), fields(user = %user_id))]
    pub async fn log_activity(
        &self,
        user_id: &UserId,
        metrics: &ActivityMetrics,
    ) -> Result<ActivityOutcome, DomainError> {
        metrics.validate()?;
        with_conflict_retry("log_activity", || self.log_activity_once(user_id, metrics)).await
    }

    async fn log_activity_once(
        &self,
        user_id: &UserId,
        metrics: &ActivityMetrics,
    ) -> Result<ActivityOutcome, DomainError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let mut tx = self.uow.begin().await?;
        let result = self
            .record_session(tx.as_mut(), user_id, metrics, today, now)
            .await;
        finish(tx, result).await
    }

    async fn record_session(
        &self,
        tx: &mut dyn EngagementTransaction,
        user_id: &UserId,
        metrics: &ActivityMetrics,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, DomainError> {
        let mut state = load_streak(tx, user_id, now).await?;
        let usable = reconcile_freezes(tx, &mut state, now).await?;

        let transition = state.apply_activity(today, now);

        let mut freeze_used = None;
        if transition == (StreakTransition::Bridged { consumed_freeze: true }) {
            let mut freeze = usable.into_iter().next().ok_or_else(|| {
                DomainError::DataIntegrity(format!(
                    "Freeze count of {} was positive without a usable freeze",
                    user_id
                ))
            })?;
            freeze.mark_used(now, today - Duration::days(1))?;
            tx.update_freeze(&freeze).await?;
            info!(
                "[streak] Freeze {} bridged the missed day of {}",
                freeze.id(),
                user_id
            );
            freeze_used = Some(freeze);
        }

        // A clock that moved backwards attributes the session to the stored day
        let activity_date = state.last_activity_date().unwrap_or(today);
        let activity = match tx.find_activity(user_id, activity_date).await? {
            Some(mut record) => {
                record.record_session(metrics, now);
                record
            }
            None => DailyActivityRecord::first_session(user_id.clone(), activity_date, metrics, now),
        };
        tx.save_activity(&activity).await?;
        tx.save_streak(&state).await?;

        let new_badges = self.award_badges(tx, &state, &activity, now).await?;

        info!(
            "[streak] {} {:?}: current {} longest {} freezes {}",
            user_id,
            transition,
            state.current_streak(),
            state.longest_streak(),
            state.freeze_count()
        );

        Ok(ActivityOutcome {
            streak: state,
            transition,
            freeze_used,
            activity,
            new_badges,
        })
    }

    async fn award_badges(
        &self,
        tx: &mut dyn EngagementTransaction,
        state: &StreakState,
        today: &DailyActivityRecord,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, DomainError> {
        if self.badges.is_empty() {
            return Ok(Vec::new());
        }

        let user_id = state.user_id();
        let totals = tx.activity_totals(user_id).await?;
        let context = BadgeContext {
            current_streak: state.current_streak(),
            longest_streak: state.longest_streak(),
            active_days: totals.active_days,
            total_practice_seconds: totals.practice_seconds,
            total_words: totals.words_typed,
            best_daily_wpm: totals.best_daily_wpm,
            average_accuracy: totals.average_accuracy,
            today_wpm: today.average_wpm(),
            today_accuracy: today.average_accuracy(),
        };
        let held: Vec<String> = tx
            .list_badges(user_id)
            .await?
            .into_iter()
            .map(|b| b.badge_id)
            .collect();

        let mut awarded = Vec::new();
        for definition in newly_earned(&self.badges, &context, &held) {
            let badge = EarnedBadge {
                user_id: user_id.clone(),
                badge_id: definition.badge_id().to_string(),
                origin: BadgeOrigin::Achievement,
                earned_at: now,
            };
            if tx.insert_badge_if_absent(&badge).await? {
                info!("[streak] {} earned badge '{}'", user_id, badge.badge_id);
                awarded.push(badge.badge_id);
            }
        }
        Ok(awarded)
    }

    /// Daily records between `from` and `to`, inclusive, oldest first
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_activity_history(
        &self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivityRecord>, DomainError> {
        if from > to {
            return Err(DomainError::InvalidInput(format!(
                "History range starts after it ends ({} > {})",
                from, to
            )));
        }
        if (to - from).num_days() >= MAX_HISTORY_DAYS {
            return Err(DomainError::InvalidInput(format!(
                "History range is limited to {} days",
                MAX_HISTORY_DAYS
            )));
        }

        let mut tx = self.uow.begin().await?;
        let result = tx.list_activity(user_id, from, to).await;
        finish(tx, result).await
    }
}
