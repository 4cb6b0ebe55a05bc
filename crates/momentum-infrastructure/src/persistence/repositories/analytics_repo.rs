use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::FromRow;

use crate::persistence::{to_i64, to_u32, to_u64, ResultExt, SqliteTransactionContext};
use momentum_domain::analytics::{AnalyticsRepository, EngagementSnapshot};
use momentum_domain::shared::DomainError;

#[derive(FromRow)]
struct StreakAggregateRow {
    total_users: i64,
    at_risk_users: Option<i64>,
    average_current_streak: Option<f64>,
    best_current_streak: Option<i64>,
}

#[derive(FromRow)]
struct SnapshotRow {
    snapshot_date: NaiveDate,
    total_users: i64,
    active_today: i64,
    at_risk_users: i64,
    average_current_streak: f64,
    best_current_streak: i64,
    claims_last_day: i64,
    available_freezes: i64,
    expired_freezes: i64,
    taken_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn try_into_snapshot(self) -> Result<EngagementSnapshot, DomainError> {
        Ok(EngagementSnapshot {
            snapshot_date: self.snapshot_date,
            total_users: to_u64(self.total_users, "total_users")?,
            active_today: to_u64(self.active_today, "active_today")?,
            at_risk_users: to_u64(self.at_risk_users, "at_risk_users")?,
            average_current_streak: self.average_current_streak,
            best_current_streak: to_u32(self.best_current_streak, "best_current_streak")?,
            claims_last_day: to_u64(self.claims_last_day, "claims_last_day")?,
            available_freezes: to_u64(self.available_freezes, "available_freezes")?,
            expired_freezes: to_u64(self.expired_freezes, "expired_freezes")?,
            taken_at: self.taken_at,
        })
    }
}

#[async_trait]
impl AnalyticsRepository for SqliteTransactionContext {
    async fn collect_snapshot(
        &mut self,
        today: NaiveDate,
        claims_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DomainError> {
        let yesterday = today - Duration::days(1);

        let streaks: StreakAggregateRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_users,
                SUM(CASE WHEN last_activity_date = ?1 AND current_streak > 0 THEN 1 ELSE 0 END) AS at_risk_users,
                AVG(current_streak) AS average_current_streak,
                MAX(current_streak) AS best_current_streak
            FROM streak_states
            "#,
        )
        .bind(yesterday)
        .fetch_one(self.conn()?)
        .await
        .map_repo_error("Aggregate streaks")?;

        let active_today: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM daily_activity WHERE activity_date = ?1")
                .bind(today)
                .fetch_one(self.conn()?)
                .await
                .map_repo_error("Count active users")?;

        let claims: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reward_claims WHERE claimed_at >= ?1")
                .bind(claims_since)
                .fetch_one(self.conn()?)
                .await
                .map_repo_error("Count recent claims")?;

        let available_freezes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM streak_freezes WHERE status = 'available'",
        )
        .fetch_one(self.conn()?)
        .await
        .map_repo_error("Count available freezes")?;

        Ok(EngagementSnapshot {
            snapshot_date: today,
            total_users: to_u64(streaks.total_users, "total_users")?,
            active_today: to_u64(active_today, "active_today")?,
            at_risk_users: to_u64(streaks.at_risk_users.unwrap_or(0), "at_risk_users")?,
            average_current_streak: streaks.average_current_streak.unwrap_or(0.0),
            best_current_streak: to_u32(
                streaks.best_current_streak.unwrap_or(0),
                "best_current_streak",
            )?,
            claims_last_day: to_u64(claims, "claims_last_day")?,
            available_freezes: to_u64(available_freezes, "available_freezes")?,
            expired_freezes: 0,
            taken_at: now,
        })
    }

    async fn save_snapshot(&mut self, snapshot: &EngagementSnapshot) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO engagement_snapshots (
                snapshot_date, total_users, active_today, at_risk_users,
                average_current_streak, best_current_streak, claims_last_day,
                available_freezes, expired_freezes, taken_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(snapshot_date) DO UPDATE SET
                total_users = ?2,
                active_today = ?3,
                at_risk_users = ?4,
                average_current_streak = ?5,
                best_current_streak = ?6,
                claims_last_day = ?7,
                available_freezes = ?8,
                -- repeated sweeps on one day accumulate expirations
                expired_freezes = expired_freezes + ?9,
                taken_at = ?10
        "#;

        sqlx::query(query)
            .bind(snapshot.snapshot_date)
            .bind(to_i64(snapshot.total_users, "total_users")?)
            .bind(to_i64(snapshot.active_today, "active_today")?)
            .bind(to_i64(snapshot.at_risk_users, "at_risk_users")?)
            .bind(snapshot.average_current_streak)
            .bind(i64::from(snapshot.best_current_streak))
            .bind(to_i64(snapshot.claims_last_day, "claims_last_day")?)
            .bind(to_i64(snapshot.available_freezes, "available_freezes")?)
            .bind(to_i64(snapshot.expired_freezes, "expired_freezes")?)
            .bind(snapshot.taken_at)
            .execute(self.conn()?)
            .await
            .map_repo_error("Save engagement snapshot")?;

        Ok(())
    }

    async fn latest_snapshot(&mut self) -> Result<Option<EngagementSnapshot>, DomainError> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT snapshot_date, total_users, active_today, at_risk_users,
                   average_current_streak, best_current_streak, claims_last_day,
                   available_freezes, expired_freezes, taken_at
            FROM engagement_snapshots
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.conn()?)
        .await
        .map_repo_error("Find latest snapshot")?;

        row.map(|r| r.try_into_snapshot()).transpose()
    }
}
