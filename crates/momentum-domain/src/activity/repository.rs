use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DailyActivityRecord;
use crate::shared::{DomainError, UserId};

/// Lifetime aggregates over a user's activity log
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityTotals {
    pub active_days: u32,
    pub practice_seconds: u64,
    pub words_typed: u64,
    pub best_daily_wpm: f64,
    pub average_accuracy: f64,
}

#[async_trait]
pub trait ActivityLogRepository: Send {
    /// Find the record for a user on a calendar day
    async fn find_activity(
        &mut self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivityRecord>, DomainError>;

    /// Upsert the record keyed by (user, date)
    async fn save_activity(&mut self, record: &DailyActivityRecord) -> Result<(), DomainError>;

    /// Records in `[from, to]`, oldest first
    async fn list_activity(
        &mut self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivityRecord>, DomainError>;

    async fn activity_totals(&mut self, user_id: &UserId) -> Result<ActivityTotals, DomainError>;
}
