use chrono::NaiveDate;
use std::sync::Arc;

use crate::application::dtos::*;
use crate::presentation::error::CommandError;
use crate::presentation::state::Services;
use momentum_domain::freeze::FreezeSource;
use momentum_domain::shared::{Clock, DomainError, UserId};

type CommandResult<T> = Result<T, CommandError>;

/// Operations exposed to the transport layer.
///
/// Raw identifiers are validated here; every result is a serializable DTO or
/// a `CommandError`.
#[derive(Clone)]
pub struct EngagementFacade {
    services: Services,
    clock: Arc<dyn Clock>,
    expose_internal_errors: bool,
}

impl EngagementFacade {
    pub fn new(services: Services, clock: Arc<dyn Clock>, expose_internal_errors: bool) -> Self {
        Self {
            services,
            clock,
            expose_internal_errors,
        }
    }

    fn fail(&self, err: DomainError) -> CommandError {
        CommandError::from_domain(err, self.expose_internal_errors)
    }

    fn user(&self, raw: &str) -> CommandResult<UserId> {
        UserId::parse(raw).map_err(|e| self.fail(e))
    }

    // ============================================================
    // Streaks & activity
    // ============================================================

    pub async fn get_streak(&self, user_id: &str) -> CommandResult<StreakStateDto> {
        let user_id = self.user(user_id)?;
        let state = self
            .services
            .streak
            .get_streak(&user_id)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(StreakStateDto::from_state(&state, self.clock.today()))
    }

    pub async fn log_activity(
        &self,
        user_id: &str,
        metrics: ActivityMetricsInput,
    ) -> CommandResult<ActivityOutcomeDto> {
        let user_id = self.user(user_id)?;
        let outcome = self
            .services
            .streak
            .log_activity(&user_id, &metrics.into())
            .await
            .map_err(|e| self.fail(e))?;

        Ok(ActivityOutcomeDto {
            streak: StreakStateDto::from_state(&outcome.streak, self.clock.today()),
            transition: outcome.transition,
            freeze_bridged: outcome.freeze_bridged(),
            freeze_used: outcome.freeze_used.as_ref().map(FreezeDto::from),
            streak_reset: outcome.streak_reset(),
            activity: DailyActivityDto::from(&outcome.activity),
            new_badges: outcome.new_badges,
        })
    }

    /// `from` and `to` are inclusive `YYYY-MM-DD` dates
    pub async fn get_activity_history(
        &self,
        user_id: &str,
        from: &str,
        to: &str,
    ) -> CommandResult<Vec<DailyActivityDto>> {
        let user_id = self.user(user_id)?;
        let from = parse_date(from)?;
        let to = parse_date(to)?;
        let records = self
            .services
            .streak
            .get_activity_history(&user_id, from, to)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(records.iter().map(DailyActivityDto::from).collect())
    }

    // ============================================================
    // Rewards & claims
    // ============================================================

    pub async fn get_available_rewards(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> CommandResult<AvailableRewardsDto> {
        let user_id = self.user(user_id)?;
        self.services
            .reward
            .get_available_rewards(&user_id, page, page_size)
            .await
            .map_err(|e| self.fail(e))
    }

    pub async fn get_next_reward(&self, user_id: &str) -> CommandResult<NextRewardDto> {
        let user_id = self.user(user_id)?;
        let next = self
            .services
            .reward
            .get_next_reward(&user_id)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(NextRewardDto::from(&next))
    }

    pub async fn get_todays_reward(&self, user_id: &str) -> CommandResult<Option<TodaysRewardDto>> {
        let user_id = self.user(user_id)?;
        let daily = self
            .services
            .reward
            .get_todays_reward(&user_id)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(daily.as_ref().map(TodaysRewardDto::from))
    }

    pub async fn get_reward_history(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> CommandResult<RewardHistoryDto> {
        let user_id = self.user(user_id)?;
        self.services
            .reward
            .get_reward_history(&user_id, page, page_size)
            .await
            .map_err(|e| self.fail(e))
    }

    pub async fn claim_reward(&self, user_id: &str, milestone: i64) -> CommandResult<ClaimOutcomeDto> {
        let user_id = self.user(user_id)?;
        let claim = self
            .services
            .claim
            .claim_reward(&user_id, milestone)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(ClaimOutcomeDto::from(&claim))
    }

    // ============================================================
    // Freezes
    // ============================================================

    pub async fn use_freeze(&self, user_id: &str, freeze_id: i64) -> CommandResult<FreezeUsageDto> {
        let user_id = self.user(user_id)?;
        let usage = self
            .services
            .freeze
            .use_freeze(&user_id, freeze_id)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(FreezeUsageDto {
            freeze: FreezeDto::from(&usage.freeze),
            protected_streak: usage.protected_streak,
        })
    }

    /// `source` is one of `reward`, `purchase` or `admin`
    pub async fn grant_freeze(&self, user_id: &str, source: &str) -> CommandResult<FreezeDto> {
        let user_id = self.user(user_id)?;
        let source = FreezeSource::parse(source.trim()).map_err(|_| {
            CommandError::invalid_input(format!("Unknown freeze source '{}'", source))
        })?;
        let freeze = self
            .services
            .freeze
            .grant_freeze(&user_id, source)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(FreezeDto::from(&freeze))
    }

    pub async fn list_freezes(&self, user_id: &str) -> CommandResult<Vec<FreezeDto>> {
        let user_id = self.user(user_id)?;
        let freezes = self
            .services
            .freeze
            .list_freezes(&user_id)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(freezes.iter().map(FreezeDto::from).collect())
    }

    // ============================================================
    // Experiments
    // ============================================================

    pub async fn get_experiment_variant(
        &self,
        user_id: &str,
        feature_name: &str,
    ) -> CommandResult<ExperimentVariantDto> {
        let user_id = self.user(user_id)?;
        let variant = self
            .services
            .experiment
            .get_variant(&user_id, feature_name)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(ExperimentVariantDto {
            feature_name: feature_name.trim().to_string(),
            variant,
        })
    }

    pub async fn register_experiment(
        &self,
        input: RegisterExperimentInput,
    ) -> CommandResult<ExperimentDto> {
        let experiment = self
            .services
            .experiment
            .register_experiment(&input.name, &input.feature_name, input.variants, input.active)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(ExperimentDto::from(&experiment))
    }

    pub async fn set_experiment_active(&self, name: &str, active: bool) -> CommandResult<ExperimentDto> {
        let experiment = self
            .services
            .experiment
            .set_experiment_active(name, active)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(ExperimentDto::from(&experiment))
    }

    // ============================================================
    // Ledger
    // ============================================================

    pub async fn get_point_balance(&self, user_id: &str) -> CommandResult<PointBalanceDto> {
        let user_id = self.user(user_id)?;
        self.services
            .ledger
            .get_point_balance(&user_id)
            .await
            .map_err(|e| self.fail(e))
    }

    pub async fn list_badges(&self, user_id: &str) -> CommandResult<Vec<BadgeDto>> {
        let user_id = self.user(user_id)?;
        self.services
            .ledger
            .get_badges(&user_id)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Ids of the themes the user unlocked, oldest first
    pub async fn list_themes(&self, user_id: &str) -> CommandResult<Vec<String>> {
        let user_id = self.user(user_id)?;
        let themes = self
            .services
            .ledger
            .get_unlocked_themes(&user_id)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(themes.into_iter().map(|t| t.theme_id).collect())
    }
}

fn parse_date(raw: &str) -> CommandResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::invalid_input(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}
