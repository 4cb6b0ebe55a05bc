use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::experiment_service::resolve_variant;
use super::freeze_service::grant_capped;
use super::reward_service::surprise_roll_for_milestone;
use super::streak_service::load_streak;
use super::transaction::{finish, with_conflict_retry};
use momentum_domain::claim::{AppliedEffect, ClaimRecord};
use momentum_domain::experiment::STREAKS_FEATURE;
use momentum_domain::freeze::{FreezePolicy, FreezeSource};
use momentum_domain::ledger::{
    strongest_multiplier, BadgeOrigin, EarnedBadge, PointBalance, PointMultiplier, UnlockedTheme,
};
use momentum_domain::reward::{claimable_at, RewardDefinition, RewardKind, SurpriseEffect, SurprisePolicy};
use momentum_domain::shared::{Clock, DomainError, RandomSource, UserId};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};

/// Claim transactor: redeems a reached milestone exactly once
pub struct ClaimService {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    freeze_policy: FreezePolicy,
    surprise_policy: SurprisePolicy,
    milestone_step: u32,
}

impl ClaimService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
        freeze_policy: FreezePolicy,
        surprise_policy: SurprisePolicy,
        milestone_step: u32,
    ) -> Self {
        Self {
            uow,
            clock,
            rng,
            freeze_policy,
            surprise_policy,
            milestone_step,
        }
    }

    /// Redeem `milestone`. Either the effect is applied and the claim is
    /// recorded, or nothing changes.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn claim_reward(
        &self,
        user_id: &UserId,
        milestone: i64,
    ) -> Result<ClaimRecord, DomainError> {
        let milestone = u32::try_from(milestone)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| DomainError::InvalidMilestoneId(milestone.to_string()))?;
        with_conflict_retry("claim_reward", || self.claim_once(user_id, milestone)).await
    }

    async fn claim_once(&self, user_id: &UserId, milestone: u32) -> Result<ClaimRecord, DomainError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let mut tx = self.uow.begin().await?;
        let result = self
            .redeem(tx.as_mut(), user_id, milestone, today, now)
            .await;

        match result {
            // The roll stays recorded so a retry replays the same outcome
            Err(DomainError::SurpriseNotTriggered { milestone }) => {
                finish(tx, Ok(())).await?;
                Err(DomainError::SurpriseNotTriggered { milestone })
            }
            other => finish(tx, other).await,
        }
    }

    async fn redeem(
        &self,
        tx: &mut dyn EngagementTransaction,
        user_id: &UserId,
        milestone: u32,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ClaimRecord, DomainError> {
        let current = load_streak(tx, user_id, now).await?.current_streak();
        if current < milestone {
            return Err(DomainError::InsufficientStreak {
                required: milestone,
                current,
            });
        }

        let variant = resolve_variant(tx, user_id, STREAKS_FEATURE, self.rng.as_ref(), now).await?;
        let catalog = tx.load_catalog(&variant).await?;
        let definition = claimable_at(&catalog, milestone, self.milestone_step).ok_or_else(|| {
            DomainError::RewardNotFound {
                variant: variant.clone(),
                milestone,
            }
        })?;

        if tx.find_claim(user_id, milestone).await?.is_some() {
            return Err(DomainError::AlreadyClaimed { milestone });
        }

        let effect = self
            .apply_effect(tx, user_id, &definition, today, now)
            .await?;
        let claim = ClaimRecord::new(
            user_id.clone(),
            milestone,
            &variant,
            definition.kind().type_name(),
            effect,
            now,
        );
        tx.insert_claim(&claim).await?;

        info!(
            "[claim] {} claimed milestone {} ({}): {}",
            user_id,
            milestone,
            variant,
            claim.applied_effect().describe()
        );
        Ok(claim)
    }

    async fn apply_effect(
        &self,
        tx: &mut dyn EngagementTransaction,
        user_id: &UserId,
        definition: &RewardDefinition,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AppliedEffect, DomainError> {
        match definition.kind() {
            RewardKind::Points { amount } => credit_points(tx, user_id, *amount, now).await,
            RewardKind::Badge { badge_id } => {
                award_badge(tx, user_id, badge_id, BadgeOrigin::Milestone, now).await
            }
            RewardKind::FreezeGrant { count } => {
                let mut state = load_streak(tx, user_id, now).await?;
                let granted = grant_capped(
                    tx,
                    &self.freeze_policy,
                    &mut state,
                    FreezeSource::Reward,
                    *count,
                    now,
                )
                .await?;
                tx.save_streak(&state).await?;
                if granted < *count {
                    warn!(
                        "[claim] Freeze cap of {} reached for {}, granted {} of {}",
                        self.freeze_policy.max_unused, user_id, granted, count
                    );
                }
                Ok(AppliedEffect::FreezeGrant {
                    requested: *count,
                    granted,
                    capped: granted < *count,
                })
            }
            RewardKind::ThemeUnlock { theme_id } => {
                let newly_unlocked = tx
                    .insert_theme_if_absent(&UnlockedTheme {
                        user_id: user_id.clone(),
                        theme_id: theme_id.clone(),
                        unlocked_at: now,
                    })
                    .await?;
                Ok(AppliedEffect::ThemeUnlock {
                    theme_id: theme_id.clone(),
                    newly_unlocked,
                })
            }
            RewardKind::Surprise => {
                let roll = surprise_roll_for_milestone(
                    tx,
                    user_id,
                    definition,
                    self.rng.as_ref(),
                    today,
                    now,
                )
                .await?;
                if !roll.fired() {
                    return Err(DomainError::SurpriseNotTriggered {
                        milestone: definition.milestone(),
                    });
                }

                let surprise = match roll.multiplier() {
                    Some(factor) => self.surprise_policy.multiplier(factor, now),
                    None => self.surprise_policy.resolve(self.rng.as_ref(), now),
                };
                self.apply_surprise(tx, user_id, surprise, now).await
            }
        }
    }

    async fn apply_surprise(
        &self,
        tx: &mut dyn EngagementTransaction,
        user_id: &UserId,
        surprise: SurpriseEffect,
        now: DateTime<Utc>,
    ) -> Result<AppliedEffect, DomainError> {
        match surprise {
            SurpriseEffect::Points { amount } => credit_points(tx, user_id, amount, now).await,
            SurpriseEffect::Badge { badge_id } => {
                award_badge(tx, user_id, &badge_id, BadgeOrigin::Surprise, now).await
            }
            SurpriseEffect::Multiplier { factor, expires_at } => {
                tx.insert_multiplier(&PointMultiplier {
                    user_id: user_id.clone(),
                    factor,
                    source: "surprise".to_string(),
                    granted_at: now,
                    expires_at,
                })
                .await?;
                Ok(AppliedEffect::Multiplier { factor, expires_at })
            }
        }
    }
}

/// Credit `base` points, scaled by the strongest active multiplier
async fn credit_points(
    tx: &mut dyn EngagementTransaction,
    user_id: &UserId,
    base: i64,
    now: DateTime<Utc>,
) -> Result<AppliedEffect, DomainError> {
    let multipliers = tx.active_multipliers(user_id, now).await?;
    let strongest = strongest_multiplier(&multipliers, now);
    let amount = strongest.map_or(base, |m| m.apply(base));

    let mut balance = tx
        .find_balance(user_id)
        .await?
        .unwrap_or_else(|| PointBalance::empty(user_id.clone(), now));
    balance.credit(amount, now)?;
    tx.save_balance(&balance).await?;

    Ok(AppliedEffect::Points {
        amount,
        multiplier: strongest.map(|m| m.factor),
    })
}

async fn award_badge(
    tx: &mut dyn EngagementTransaction,
    user_id: &UserId,
    badge_id: &str,
    origin: BadgeOrigin,
    now: DateTime<Utc>,
) -> Result<AppliedEffect, DomainError> {
    let newly_earned = tx
        .insert_badge_if_absent(&EarnedBadge {
            user_id: user_id.clone(),
            badge_id: badge_id.to_string(),
            origin,
            earned_at: now,
        })
        .await?;
    Ok(AppliedEffect::Badge {
        badge_id: badge_id.to_string(),
        newly_earned,
    })
}
