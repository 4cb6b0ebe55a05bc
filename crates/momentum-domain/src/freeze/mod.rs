mod repository;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, UserId};

pub use repository::FreezeRepository;

pub const DEFAULT_MAX_UNUSED_FREEZES: u32 = 3;
pub const DEFAULT_FREEZE_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeSource {
    Reward,
    Purchase,
    Admin,
}

impl FreezeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreezeSource::Reward => "reward",
            FreezeSource::Purchase => "purchase",
            FreezeSource::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "reward" => Ok(FreezeSource::Reward),
            "purchase" => Ok(FreezeSource::Purchase),
            "admin" => Ok(FreezeSource::Admin),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown freeze source: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeStatus {
    Available,
    Used,
    Expired,
}

impl FreezeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreezeStatus::Available => "available",
            FreezeStatus::Used => "used",
            FreezeStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "available" => Ok(FreezeStatus::Available),
            "used" => Ok(FreezeStatus::Used),
            "expired" => Ok(FreezeStatus::Expired),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown freeze status: {}",
                other
            ))),
        }
    }
}

/// Limits applied to a user's freeze pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezePolicy {
    /// Hard cap on concurrently unused freezes
    pub max_unused: u32,
    /// Days a freeze stays usable; `None` disables expiry
    pub validity_days: Option<i64>,
}

impl Default for FreezePolicy {
    fn default() -> Self {
        Self {
            max_unused: DEFAULT_MAX_UNUSED_FREEZES,
            validity_days: Some(DEFAULT_FREEZE_VALIDITY_DAYS),
        }
    }
}

impl FreezePolicy {
    /// Reject grants that would exceed the cap
    pub fn check_grant(&self, available: u32) -> Result<(), DomainError> {
        if available >= self.max_unused {
            return Err(DomainError::FreezeLimitReached {
                limit: self.max_unused,
            });
        }
        Ok(())
    }

    /// How many of `requested` freezes fit under the cap
    pub fn grantable(&self, available: u32, requested: u32) -> u32 {
        self.max_unused.saturating_sub(available).min(requested)
    }

    pub fn new_freeze(
        &self,
        user_id: UserId,
        source: FreezeSource,
        now: DateTime<Utc>,
    ) -> NewFreeze {
        NewFreeze {
            user_id,
            source,
            granted_at: now,
            expires_at: self.validity_days.map(|days| now + Duration::days(days)),
        }
    }
}

/// A freeze about to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFreeze {
    pub user_id: UserId,
    pub source: FreezeSource,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A single streak-freeze token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakFreeze {
    id: i64,
    user_id: UserId,
    source: FreezeSource,
    status: FreezeStatus,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    used_at: Option<DateTime<Utc>>,
    protected_date: Option<NaiveDate>,
}

impl StreakFreeze {
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: i64,
        user_id: UserId,
        source: FreezeSource,
        status: FreezeStatus,
        granted_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        used_at: Option<DateTime<Utc>>,
        protected_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            user_id,
            source,
            status,
            granted_at,
            expires_at,
            used_at,
            protected_date,
        }
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    /// Available and not past expiry
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == FreezeStatus::Available && !self.is_past_expiry(now)
    }

    /// Spend the freeze on the missed `protected_date`
    pub fn mark_used(
        &mut self,
        now: DateTime<Utc>,
        protected_date: NaiveDate,
    ) -> Result<(), DomainError> {
        if !self.is_usable(now) {
            return Err(DomainError::FreezeNotFoundOrExpired(self.id));
        }
        self.status = FreezeStatus::Used;
        self.used_at = Some(now);
        self.protected_date = Some(protected_date);
        Ok(())
    }

    pub fn mark_expired(&mut self) {
        if self.status == FreezeStatus::Available {
            self.status = FreezeStatus::Expired;
        }
    }

    // Getters
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn source(&self) -> FreezeSource {
        self.source
    }

    pub fn status(&self) -> FreezeStatus {
        self.status
    }

    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn used_at(&self) -> Option<DateTime<Utc>> {
        self.used_at
    }

    pub fn protected_date(&self) -> Option<NaiveDate> {
        self.protected_date
    }
}
