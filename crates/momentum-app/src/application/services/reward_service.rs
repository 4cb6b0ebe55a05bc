use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use super::experiment_service::resolve_variant;
use super::streak_service::load_streak;
use super::transaction::{finish, with_conflict_retry};
use crate::application::dtos::{
    AvailableRewardsDto, ClaimDto, NextRewardDto, RewardDto, RewardEntryDto, RewardHistoryDto,
    RewardStatus,
};
use momentum_domain::experiment::STREAKS_FEATURE;
use momentum_domain::reward::{DailyReward, NextReward, RewardDefinition, SurpriseRoll};
use momentum_domain::shared::{
    Clock, DomainError, PageRequest, Pagination, RandomSource, UserId,
};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};

/// The persisted roll of `definition`, rolling and storing it (dated `today`)
/// on first access. A milestone is rolled once per user; later queries and
/// claims on any day replay the stored outcome.
pub(crate) async fn surprise_roll_for_milestone(
    tx: &mut dyn EngagementTransaction,
    user_id: &UserId,
    definition: &RewardDefinition,
    rng: &dyn RandomSource,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<SurpriseRoll, DomainError> {
    let milestone = definition.milestone();
    if let Some(roll) = tx.find_latest_roll(user_id, milestone).await? {
        return Ok(roll);
    }

    let roll = SurpriseRoll::roll(user_id, today, definition, rng, now);
    if tx.insert_roll(&roll).await? {
        info!(
            "[reward] Surprise roll for {} at milestone {}: {:.3} vs {:.3}, fired: {}",
            user_id,
            milestone,
            roll.roll_value(),
            definition.probability(),
            roll.fired()
        );
        return Ok(roll);
    }

    tx.find_latest_roll(user_id, milestone).await?.ok_or_else(|| {
        DomainError::TransactionConflict(format!(
            "Surprise roll of {} for milestone {} raced",
            user_id, milestone
        ))
    })
}

/// Reward resolver queries: catalog status, next milestone, today's reward
pub struct RewardService {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    milestone_step: u32,
}

impl RewardService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
        milestone_step: u32,
    ) -> Self {
        Self {
            uow,
            clock,
            rng,
            milestone_step,
        }
    }

    /// Catalog of the user's variant with claimed / claimable / locked status
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_available_rewards(
        &self,
        user_id: &UserId,
        page: u32,
        page_size: u32,
    ) -> Result<AvailableRewardsDto, DomainError> {
        let request = PageRequest::new(page, page_size)?;
        with_conflict_retry("get_available_rewards", || {
            self.available_once(user_id, request)
        })
        .await
    }

    async fn available_once(
        &self,
        user_id: &UserId,
        request: PageRequest,
    ) -> Result<AvailableRewardsDto, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let state = load_streak(tx.as_mut(), user_id, now).await?;
            let streak = state.current_streak();
            let variant =
                resolve_variant(tx.as_mut(), user_id, STREAKS_FEATURE, self.rng.as_ref(), now)
                    .await?;
            let catalog = tx.load_catalog(&variant).await?;
            let claimed = tx.claimed_milestones(user_id).await?;
            let next = NextReward::resolve(&catalog, streak, self.milestone_step);

            let mut definitions: Vec<RewardDefinition> =
                catalog.entries().into_iter().cloned().collect();
            if next.synthesized {
                definitions.push(next.reward.clone());
            }

            let entries: Vec<RewardEntryDto> = definitions
                .iter()
                .map(|definition| {
                    let milestone = definition.milestone();
                    let status = if claimed.contains(&milestone) {
                        RewardStatus::Claimed
                    } else if streak >= milestone {
                        RewardStatus::Claimable
                    } else {
                        RewardStatus::Locked
                    };
                    RewardEntryDto {
                        reward: RewardDto::from(definition),
                        status,
                        days_remaining: milestone.saturating_sub(streak),
                    }
                })
                .collect();
            let page = request.slice(&entries);

            Ok::<_, DomainError>(AvailableRewardsDto {
                variant,
                current_streak: streak,
                rewards: page.items,
                next_reward: NextRewardDto::from(&next),
                pagination: page.pagination,
            })
        }
        .await;
        finish(tx, result).await
    }

    /// Smallest milestone above the current streak; never empty
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_next_reward(&self, user_id: &UserId) -> Result<NextReward, DomainError> {
        with_conflict_retry("get_next_reward", || self.next_once(user_id)).await
    }

    async fn next_once(&self, user_id: &UserId) -> Result<NextReward, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let state = load_streak(tx.as_mut(), user_id, now).await?;
            let variant =
                resolve_variant(tx.as_mut(), user_id, STREAKS_FEATURE, self.rng.as_ref(), now)
                    .await?;
            let catalog = tx.load_catalog(&variant).await?;
            Ok::<_, DomainError>(NextReward::resolve(
                &catalog,
                state.current_streak(),
                self.milestone_step,
            ))
        }
        .await;
        finish(tx, result).await
    }

    /// Reward for the milestone equal to the current streak, if any.
    /// A surprise entry only yields a reward when its roll fired.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_todays_reward(
        &self,
        user_id: &UserId,
    ) -> Result<Option<DailyReward>, DomainError> {
        with_conflict_retry("get_todays_reward", || self.today_once(user_id)).await
    }

    async fn today_once(&self, user_id: &UserId) -> Result<Option<DailyReward>, DomainError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let streak = load_streak(tx.as_mut(), user_id, now)
                .await?
                .current_streak();
            if streak == 0 {
                return Ok::<_, DomainError>(None);
            }

            let variant =
                resolve_variant(tx.as_mut(), user_id, STREAKS_FEATURE, self.rng.as_ref(), now)
                    .await?;
            let catalog = tx.load_catalog(&variant).await?;

            if let Some(definition) = catalog.regular_at(streak) {
                return Ok(Some(DailyReward::Regular {
                    definition: definition.clone(),
                }));
            }
            match catalog.surprise_at(streak) {
                Some(definition) => {
                    let roll = surprise_roll_for_milestone(
                        tx.as_mut(),
                        user_id,
                        definition,
                        self.rng.as_ref(),
                        today,
                        now,
                    )
                    .await?;
                    Ok(DailyReward::from_roll(definition, &roll))
                }
                None => Ok::<_, DomainError>(None),
            }
        }
        .await;
        finish(tx, result).await
    }

    /// Claims of the user, newest first
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_reward_history(
        &self,
        user_id: &UserId,
        page: u32,
        page_size: u32,
    ) -> Result<RewardHistoryDto, DomainError> {
        let request = PageRequest::new(page, page_size)?;
        with_conflict_retry("get_reward_history", || self.history_once(user_id, request)).await
    }

    async fn history_once(
        &self,
        user_id: &UserId,
        request: PageRequest,
    ) -> Result<RewardHistoryDto, DomainError> {
        let mut tx = self.uow.begin().await?;
        let result = async {
            let total = tx.count_claims(user_id).await?;
            let claims = tx
                .list_claims(user_id, request.offset(), request.limit())
                .await?;
            Ok::<_, DomainError>(RewardHistoryDto {
                claims: claims.iter().map(ClaimDto::from).collect(),
                pagination: Pagination::new(request, total),
            })
        }
        .await;
        finish(tx, result).await
    }
}
