use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::{AlertLevel, NotificationMessage};
use crate::shared::DomainError;

/// Aggregate engagement figures taken by the daily sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub snapshot_date: NaiveDate,
    pub total_users: u64,
    pub active_today: u64,
    /// Practiced yesterday but not yet today
    pub at_risk_users: u64,
    pub average_current_streak: f64,
    pub best_current_streak: u32,
    pub claims_last_day: u64,
    pub available_freezes: u64,
    /// Filled in by the sweep after expiring stale freezes
    pub expired_freezes: u64,
    pub taken_at: DateTime<Utc>,
}

impl EngagementSnapshot {
    pub fn at_risk_ratio(&self) -> f64 {
        if self.total_users == 0 {
            return 0.0;
        }
        self.at_risk_users as f64 / self.total_users as f64
    }

    pub fn summary(&self) -> NotificationMessage {
        NotificationMessage::new(
            AlertLevel::Info,
            format!("Engagement report {}", self.snapshot_date),
            format!(
                "users: {}\nactive today: {}\nat risk: {}\naverage streak: {:.1}\nbest streak: {}\nclaims (24h): {}\nfreezes available: {}\nfreezes expired: {}",
                self.total_users,
                self.active_today,
                self.at_risk_users,
                self.average_current_streak,
                self.best_current_streak,
                self.claims_last_day,
                self.available_freezes,
                self.expired_freezes,
            ),
        )
    }

    /// Warning when the share of at-risk streaks reaches `threshold`
    pub fn at_risk_alert(&self, threshold: f64) -> Option<NotificationMessage> {
        let ratio = self.at_risk_ratio();
        if self.at_risk_users == 0 || ratio < threshold {
            return None;
        }
        Some(NotificationMessage::new(
            AlertLevel::Warning,
            "Streaks at risk",
            format!(
                "{} of {} users ({:.0}%) will lose their streak without practice today",
                self.at_risk_users,
                self.total_users,
                ratio * 100.0
            ),
        ))
    }
}

#[async_trait]
pub trait AnalyticsRepository: Send {
    /// Aggregate across all users; `expired_freezes` is left at zero
    async fn collect_snapshot(
        &mut self,
        today: NaiveDate,
        claims_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DomainError>;

    /// Upsert keyed by snapshot date
    async fn save_snapshot(&mut self, snapshot: &EngagementSnapshot) -> Result<(), DomainError>;

    async fn latest_snapshot(&mut self) -> Result<Option<EngagementSnapshot>, DomainError>;
}
