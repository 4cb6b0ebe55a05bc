use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use momentum_domain::activity::{ActivityMetrics, DailyActivityRecord};
use momentum_domain::claim::{AppliedEffect, ClaimRecord};
use momentum_domain::experiment::Experiment;
use momentum_domain::freeze::StreakFreeze;
use momentum_domain::ledger::EarnedBadge;
use momentum_domain::reward::{DailyReward, NextReward, RewardDefinition};
use momentum_domain::shared::Pagination;
use momentum_domain::streak::{StreakState, StreakTransition};

// ============================================================
// Streak & Activity DTOs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakStateDto {
    pub user_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<String>, // ISO 8601 date (YYYY-MM-DD)
    pub freeze_count: u32,
    pub freeze_pending_consumption: bool,
    /// Practised yesterday but not yet today
    pub at_risk: bool,
}

impl StreakStateDto {
    pub fn from_state(state: &StreakState, today: NaiveDate) -> Self {
        Self {
            user_id: state.user_id().to_string(),
            current_streak: state.current_streak(),
            longest_streak: state.longest_streak(),
            last_activity_date: state.last_activity_date().map(|d| d.to_string()),
            freeze_count: state.freeze_count(),
            freeze_pending_consumption: state.freeze_pending_consumption(),
            at_risk: state.is_at_risk(today),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActivityMetricsInput {
    pub practice_seconds: u32,
    pub characters_typed: u32,
    pub words_typed: u32,
    pub wpm: f64,
    pub accuracy: f64, // percentage (0.0 - 100.0)
}

impl From<ActivityMetricsInput> for ActivityMetrics {
    fn from(input: ActivityMetricsInput) -> Self {
        Self {
            practice_seconds: input.practice_seconds,
            characters_typed: input.characters_typed,
            words_typed: input.words_typed,
            wpm: input.wpm,
            accuracy: input.accuracy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyActivityDto {
    pub date: String, // YYYY-MM-DD
    pub practice_seconds: u64,
    pub characters_typed: u64,
    pub words_typed: u64,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub session_count: u32,
}

impl From<&DailyActivityRecord> for DailyActivityDto {
    fn from(record: &DailyActivityRecord) -> Self {
        Self {
            date: record.date().to_string(),
            practice_seconds: record.practice_seconds(),
            characters_typed: record.characters_typed(),
            words_typed: record.words_typed(),
            average_wpm: record.average_wpm(),
            average_accuracy: record.average_accuracy(),
            session_count: record.session_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutcomeDto {
    pub streak: StreakStateDto,
    pub transition: StreakTransition,
    pub freeze_bridged: bool,
    /// Freeze consumed automatically by this activity, if any
    pub freeze_used: Option<FreezeDto>,
    pub streak_reset: bool,
    pub activity: DailyActivityDto,
    pub new_badges: Vec<String>,
}

// ============================================================
// Freeze DTOs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeDto {
    pub id: i64,
    pub source: String,
    pub status: String,
    pub granted_at: String,
    pub expires_at: Option<String>,
    pub used_at: Option<String>,
    pub protected_date: Option<String>,
}

impl From<&StreakFreeze> for FreezeDto {
    fn from(freeze: &StreakFreeze) -> Self {
        Self {
            id: freeze.id(),
            source: freeze.source().as_str().to_string(),
            status: freeze.status().as_str().to_string(),
            granted_at: freeze.granted_at().to_rfc3339(),
            expires_at: freeze.expires_at().map(|t| t.to_rfc3339()),
            used_at: freeze.used_at().map(|t| t.to_rfc3339()),
            protected_date: freeze.protected_date().map(|d| d.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeUsageDto {
    pub freeze: FreezeDto,
    pub protected_streak: u32,
}

// ============================================================
// Reward DTOs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardDto {
    pub milestone: u32,
    pub reward_type: String,
    pub value: String,
    pub description: String,
    pub is_surprise: bool,
    pub probability: f64,
    pub multiplier_min: Option<f64>,
    pub multiplier_max: Option<f64>,
}

impl From<&RewardDefinition> for RewardDto {
    fn from(definition: &RewardDefinition) -> Self {
        let range = definition.multiplier_range();
        Self {
            milestone: definition.milestone(),
            reward_type: definition.kind().type_name().to_string(),
            value: definition.kind().value(),
            description: definition.description().to_string(),
            is_surprise: definition.is_surprise(),
            probability: definition.probability(),
            multiplier_min: range.map(|r| r.min()),
            multiplier_max: range.map(|r| r.max()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Claimed,
    Claimable,
    Locked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEntryDto {
    pub reward: RewardDto,
    pub status: RewardStatus,
    pub days_remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextRewardDto {
    pub milestone: u32,
    pub days_remaining: u32,
    pub reward: RewardDto,
    pub synthesized: bool,
}

impl From<&NextReward> for NextRewardDto {
    fn from(next: &NextReward) -> Self {
        Self {
            milestone: next.milestone,
            days_remaining: next.days_remaining,
            reward: RewardDto::from(&next.reward),
            synthesized: next.synthesized,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableRewardsDto {
    pub variant: String,
    pub current_streak: u32,
    pub rewards: Vec<RewardEntryDto>,
    pub next_reward: NextRewardDto,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodaysRewardDto {
    pub milestone: u32,
    pub source: String, // "regular" | "surprise"
    pub reward: RewardDto,
    pub multiplier: Option<f64>,
    pub effect_description: String,
}

impl From<&DailyReward> for TodaysRewardDto {
    fn from(daily: &DailyReward) -> Self {
        let (source, multiplier) = match daily {
            DailyReward::Regular { .. } => ("regular", None),
            DailyReward::Surprise { multiplier, .. } => ("surprise", *multiplier),
        };
        Self {
            milestone: daily.definition().milestone(),
            source: source.to_string(),
            reward: RewardDto::from(daily.definition()),
            multiplier,
            effect_description: daily.effect_description(),
        }
    }
}

// ============================================================
// Claim DTOs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDto {
    pub id: String,
    pub milestone: u32,
    pub variant: String,
    pub reward_type: String,
    pub applied_effect: AppliedEffect,
    pub effect_description: String,
    pub claimed_at: String,
}

impl From<&ClaimRecord> for ClaimDto {
    fn from(claim: &ClaimRecord) -> Self {
        Self {
            id: claim.id().to_string(),
            milestone: claim.milestone(),
            variant: claim.variant().to_string(),
            reward_type: claim.reward_type().to_string(),
            applied_effect: claim.applied_effect().clone(),
            effect_description: claim.applied_effect().describe(),
            claimed_at: claim.claimed_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOutcomeDto {
    pub claim: ClaimDto,
    pub applied_effect: AppliedEffect,
}

impl From<&ClaimRecord> for ClaimOutcomeDto {
    fn from(claim: &ClaimRecord) -> Self {
        Self {
            claim: ClaimDto::from(claim),
            applied_effect: claim.applied_effect().clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardHistoryDto {
    pub claims: Vec<ClaimDto>,
    pub pagination: Pagination,
}

// ============================================================
// Experiment DTOs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentVariantDto {
    pub feature_name: String,
    pub variant: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDto {
    pub name: String,
    pub feature_name: String,
    pub variants: Vec<String>,
    pub active: bool,
    pub created_at: String,
}

impl From<&Experiment> for ExperimentDto {
    fn from(experiment: &Experiment) -> Self {
        Self {
            name: experiment.name().to_string(),
            feature_name: experiment.feature_name().to_string(),
            variants: experiment.variants().to_vec(),
            active: experiment.is_active(),
            created_at: experiment.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterExperimentInput {
    pub name: String,
    pub feature_name: String,
    pub variants: Vec<String>,
    pub active: bool,
}

// ============================================================
// Ledger DTOs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointBalanceDto {
    pub balance: i64,
    /// Strongest multiplier currently scaling point rewards
    pub active_multiplier: Option<f64>,
    pub multiplier_expires_at: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeDto {
    pub badge_id: String,
    pub origin: String, // "milestone" | "achievement" | "surprise"
    pub earned_at: String,
}

impl From<&EarnedBadge> for BadgeDto {
    fn from(badge: &EarnedBadge) -> Self {
        Self {
            badge_id: badge.badge_id.clone(),
            origin: badge.origin.as_str().to_string(),
            earned_at: badge.earned_at.to_rfc3339(),
        }
    }
}
