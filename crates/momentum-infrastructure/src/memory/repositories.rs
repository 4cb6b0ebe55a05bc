use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::InMemoryTransaction;
use momentum_domain::activity::{ActivityLogRepository, ActivityTotals, DailyActivityRecord};
use momentum_domain::analytics::{AnalyticsRepository, EngagementSnapshot};
use momentum_domain::claim::{ClaimRecord, ClaimRepository};
use momentum_domain::experiment::{Experiment, ExperimentAssignment, ExperimentRepository};
use momentum_domain::freeze::{FreezeRepository, FreezeStatus, NewFreeze, StreakFreeze};
use momentum_domain::ledger::{
    EarnedBadge, LedgerRepository, PointBalance, PointMultiplier, UnlockedTheme,
};
use momentum_domain::reward::{
    RewardCatalog, RewardCatalogRepository, RewardDefinition, SurpriseRoll,
    SurpriseRollRepository,
};
use momentum_domain::shared::{DomainError, UserId};
use momentum_domain::streak::{StreakRepository, StreakState};

#[async_trait]
impl StreakRepository for InMemoryTransaction {
    async fn find_streak(&mut self, user_id: &UserId) -> Result<Option<StreakState>, DomainError> {
        Ok(self.data()?.streaks.get(user_id).cloned())
    }

    async fn save_streak(&mut self, state: &StreakState) -> Result<(), DomainError> {
        self.data()?
            .streaks
            .insert(state.user_id().clone(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryTransaction {
    async fn find_activity(
        &mut self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivityRecord>, DomainError> {
        Ok(self
            .data()?
            .activity
            .get(&(user_id.clone(), date))
            .cloned())
    }

    async fn save_activity(&mut self, record: &DailyActivityRecord) -> Result<(), DomainError> {
        self.data()?
            .activity
            .insert((record.user_id().clone(), record.date()), record.clone());
        Ok(())
    }

    async fn list_activity(
        &mut self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivityRecord>, DomainError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .data()?
            .activity
            .range((user_id.clone(), from)..=(user_id.clone(), to))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn activity_totals(&mut self, user_id: &UserId) -> Result<ActivityTotals, DomainError> {
        let records: Vec<&DailyActivityRecord> = self
            .data()?
            .activity
            .values()
            .filter(|r| r.user_id() == user_id)
            .collect();

        if records.is_empty() {
            return Ok(ActivityTotals::default());
        }

        Ok(ActivityTotals {
            active_days: records.len() as u32,
            practice_seconds: records.iter().map(|r| r.practice_seconds()).sum(),
            words_typed: records.iter().map(|r| r.words_typed()).sum(),
            best_daily_wpm: records
                .iter()
                .map(|r| r.average_wpm())
                .fold(0.0, f64::max),
            average_accuracy: records.iter().map(|r| r.average_accuracy()).sum::<f64>()
                / records.len() as f64,
        })
    }
}

#[async_trait]
impl FreezeRepository for InMemoryTransaction {
    async fn insert_freeze(&mut self, freeze: &NewFreeze) -> Result<StreakFreeze, DomainError> {
        let data = self.data()?;
        data.last_freeze_id += 1;
        let record = StreakFreeze::restore(
            data.last_freeze_id,
            freeze.user_id.clone(),
            freeze.source,
            FreezeStatus::Available,
            freeze.granted_at,
            freeze.expires_at,
            None,
            None,
        );
        data.freezes.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn find_freeze(&mut self, id: i64) -> Result<Option<StreakFreeze>, DomainError> {
        Ok(self.data()?.freezes.get(&id).cloned())
    }

    async fn list_freezes(&mut self, user_id: &UserId) -> Result<Vec<StreakFreeze>, DomainError> {
        let mut freezes: Vec<StreakFreeze> = self
            .data()?
            .freezes
            .values()
            .filter(|f| f.user_id() == user_id)
            .cloned()
            .collect();
        freezes.sort_by(|a, b| (b.granted_at(), b.id()).cmp(&(a.granted_at(), a.id())));
        Ok(freezes)
    }

    async fn list_available_freezes(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<StreakFreeze>, DomainError> {
        let mut freezes: Vec<StreakFreeze> = self
            .data()?
            .freezes
            .values()
            .filter(|f| f.user_id() == user_id && f.status() == FreezeStatus::Available)
            .cloned()
            .collect();
        freezes.sort_by_key(|f| (f.granted_at(), f.id()));
        Ok(freezes)
    }

    async fn update_freeze(&mut self, freeze: &StreakFreeze) -> Result<(), DomainError> {
        match self.data()?.freezes.get_mut(&freeze.id()) {
            Some(existing) => {
                *existing = freeze.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound(format!("Freeze {}", freeze.id()))),
        }
    }

    async fn expire_stale_freezes(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<StreakFreeze>, DomainError> {
        let mut expired = Vec::new();
        for freeze in self.data()?.freezes.values_mut() {
            if freeze.status() == FreezeStatus::Available && freeze.is_past_expiry(now) {
                freeze.mark_expired();
                expired.push(freeze.clone());
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl ExperimentRepository for InMemoryTransaction {
    async fn find_assignment(
        &mut self,
        user_id: &UserId,
        feature_name: &str,
    ) -> Result<Option<ExperimentAssignment>, DomainError> {
        Ok(self
            .data()?
            .assignments
            .iter()
            .find(|a| a.user_id() == user_id && a.feature_name() == feature_name)
            .cloned())
    }

    async fn insert_assignment_if_absent(
        &mut self,
        assignment: &ExperimentAssignment,
    ) -> Result<bool, DomainError> {
        let data = self.data()?;
        let taken = data.assignments.iter().any(|a| {
            a.user_id() == assignment.user_id()
                && (a.experiment_name() == assignment.experiment_name()
                    || a.feature_name() == assignment.feature_name())
        });
        if taken {
            return Ok(false);
        }
        data.assignments.push(assignment.clone());
        Ok(true)
    }

    async fn list_active_experiments(
        &mut self,
        feature_name: &str,
    ) -> Result<Vec<Experiment>, DomainError> {
        Ok(self
            .data()?
            .experiments
            .values()
            .filter(|e| e.feature_name() == feature_name && e.is_active())
            .cloned()
            .collect())
    }

    async fn find_experiment(&mut self, name: &str) -> Result<Option<Experiment>, DomainError> {
        Ok(self.data()?.experiments.get(name).cloned())
    }

    async fn save_experiment(&mut self, experiment: &Experiment) -> Result<(), DomainError> {
        self.data()?
            .experiments
            .insert(experiment.name().to_string(), experiment.clone());
        Ok(())
    }
}

#[async_trait]
impl RewardCatalogRepository for InMemoryTransaction {
    async fn load_catalog(&mut self, variant: &str) -> Result<RewardCatalog, DomainError> {
        let definitions = self
            .data()?
            .rewards
            .iter()
            .filter(|d| d.variant() == variant)
            .cloned()
            .collect();
        Ok(RewardCatalog::new(variant, definitions))
    }

    async fn save_reward(&mut self, definition: &RewardDefinition) -> Result<(), DomainError> {
        let rewards = &mut self.data()?.rewards;
        rewards.retain(|d| {
            !(d.variant() == definition.variant()
                && d.milestone() == definition.milestone()
                && d.is_surprise() == definition.is_surprise())
        });
        rewards.push(definition.clone());
        Ok(())
    }

    async fn count_rewards(&mut self) -> Result<u64, DomainError> {
        Ok(self.data()?.rewards.len() as u64)
    }
}

#[async_trait]
impl SurpriseRollRepository for InMemoryTransaction {
    async fn find_latest_roll(
        &mut self,
        user_id: &UserId,
        milestone: u32,
    ) -> Result<Option<SurpriseRoll>, DomainError> {
        Ok(self
            .data()?
            .rolls
            .iter()
            .filter(|r| r.user_id() == user_id && r.milestone() == milestone)
            .max_by_key(|r| r.roll_date())
            .cloned())
    }

    async fn insert_roll(&mut self, roll: &SurpriseRoll) -> Result<bool, DomainError> {
        let rolls = &mut self.data()?.rolls;
        let exists = rolls.iter().any(|r| {
            r.user_id() == roll.user_id()
                && r.roll_date() == roll.roll_date()
                && r.milestone() == roll.milestone()
        });
        if exists {
            return Ok(false);
        }
        rolls.push(roll.clone());
        Ok(true)
    }
}

#[async_trait]
impl ClaimRepository for InMemoryTransaction {
    async fn find_claim(
        &mut self,
        user_id: &UserId,
        milestone: u32,
    ) -> Result<Option<ClaimRecord>, DomainError> {
        Ok(self
            .data()?
            .claims
            .iter()
            .find(|c| c.user_id() == user_id && c.milestone() == milestone)
            .cloned())
    }

    async fn insert_claim(&mut self, claim: &ClaimRecord) -> Result<(), DomainError> {
        let claims = &mut self.data()?.claims;
        if claims
            .iter()
            .any(|c| c.user_id() == claim.user_id() && c.milestone() == claim.milestone())
        {
            return Err(DomainError::AlreadyClaimed {
                milestone: claim.milestone(),
            });
        }
        claims.push(claim.clone());
        Ok(())
    }

    async fn list_claims(
        &mut self,
        user_id: &UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ClaimRecord>, DomainError> {
        let mut claims: Vec<ClaimRecord> = self
            .data()?
            .claims
            .iter()
            .filter(|c| c.user_id() == user_id)
            .cloned()
            .collect();
        claims.sort_by(|a, b| {
            (b.claimed_at(), b.milestone()).cmp(&(a.claimed_at(), a.milestone()))
        });
        Ok(claims
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect())
    }

    async fn count_claims(&mut self, user_id: &UserId) -> Result<u64, DomainError> {
        Ok(self
            .data()?
            .claims
            .iter()
            .filter(|c| c.user_id() == user_id)
            .count() as u64)
    }

    async fn claimed_milestones(&mut self, user_id: &UserId) -> Result<Vec<u32>, DomainError> {
        let mut milestones: Vec<u32> = self
            .data()?
            .claims
            .iter()
            .filter(|c| c.user_id() == user_id)
            .map(|c| c.milestone())
            .collect();
        milestones.sort_unstable();
        Ok(milestones)
    }
}

#[async_trait]
impl LedgerRepository for InMemoryTransaction {
    async fn find_balance(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<PointBalance>, DomainError> {
        Ok(self.data()?.balances.get(user_id).cloned())
    }

    async fn save_balance(&mut self, balance: &PointBalance) -> Result<(), DomainError> {
        self.data()?
            .balances
            .insert(balance.user_id().clone(), balance.clone());
        Ok(())
    }

    async fn insert_badge_if_absent(&mut self, badge: &EarnedBadge) -> Result<bool, DomainError> {
        let badges = &mut self.data()?.badges;
        if badges
            .iter()
            .any(|b| b.user_id == badge.user_id && b.badge_id == badge.badge_id)
        {
            return Ok(false);
        }
        badges.push(badge.clone());
        Ok(true)
    }

    async fn list_badges(&mut self, user_id: &UserId) -> Result<Vec<EarnedBadge>, DomainError> {
        let mut badges: Vec<EarnedBadge> = self
            .data()?
            .badges
            .iter()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect();
        badges.sort_by(|a, b| (a.earned_at, &a.badge_id).cmp(&(b.earned_at, &b.badge_id)));
        Ok(badges)
    }

    async fn insert_theme_if_absent(
        &mut self,
        theme: &UnlockedTheme,
    ) -> Result<bool, DomainError> {
        let themes = &mut self.data()?.themes;
        if themes
            .iter()
            .any(|t| t.user_id == theme.user_id && t.theme_id == theme.theme_id)
        {
            return Ok(false);
        }
        themes.push(theme.clone());
        Ok(true)
    }

    async fn list_themes(&mut self, user_id: &UserId) -> Result<Vec<UnlockedTheme>, DomainError> {
        let mut themes: Vec<UnlockedTheme> = self
            .data()?
            .themes
            .iter()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        themes.sort_by(|a, b| (a.unlocked_at, &a.theme_id).cmp(&(b.unlocked_at, &b.theme_id)));
        Ok(themes)
    }

    async fn insert_multiplier(
        &mut self,
        multiplier: &PointMultiplier,
    ) -> Result<(), DomainError> {
        self.data()?.multipliers.push(multiplier.clone());
        Ok(())
    }

    async fn active_multipliers(
        &mut self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PointMultiplier>, DomainError> {
        Ok(self
            .data()?
            .multipliers
            .iter()
            .filter(|m| &m.user_id == user_id && m.is_active(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryTransaction {
    async fn collect_snapshot(
        &mut self,
        today: NaiveDate,
        claims_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DomainError> {
        let data = self.data()?;
        let yesterday = today - Duration::days(1);
        let total_users = data.streaks.len() as u64;
        let streak_sum: u64 = data
            .streaks
            .values()
            .map(|s| u64::from(s.current_streak()))
            .sum();

        Ok(EngagementSnapshot {
            snapshot_date: today,
            total_users,
            active_today: data.activity.keys().filter(|(_, d)| *d == today).count() as u64,
            at_risk_users: data
                .streaks
                .values()
                .filter(|s| s.current_streak() > 0 && s.last_activity_date() == Some(yesterday))
                .count() as u64,
            average_current_streak: if total_users == 0 {
                0.0
            } else {
                streak_sum as f64 / total_users as f64
            },
            best_current_streak: data
                .streaks
                .values()
                .map(|s| s.current_streak())
                .max()
                .unwrap_or(0),
            claims_last_day: data
                .claims
                .iter()
                .filter(|c| c.claimed_at() >= claims_since)
                .count() as u64,
            available_freezes: data
                .freezes
                .values()
                .filter(|f| f.status() == FreezeStatus::Available)
                .count() as u64,
            expired_freezes: 0,
            taken_at: now,
        })
    }

    async fn save_snapshot(&mut self, snapshot: &EngagementSnapshot) -> Result<(), DomainError> {
        let snapshots = &mut self.data()?.snapshots;
        let mut stored = snapshot.clone();
        if let Some(previous) = snapshots.get(&snapshot.snapshot_date) {
            stored.expired_freezes += previous.expired_freezes;
        }
        snapshots.insert(snapshot.snapshot_date, stored);
        Ok(())
    }

    async fn latest_snapshot(&mut self) -> Result<Option<EngagementSnapshot>, DomainError> {
        Ok(self
            .data()?
            .snapshots
            .values()
            .next_back()
            .cloned())
    }
}
