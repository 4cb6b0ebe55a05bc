use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::persistence::{to_u32, ResultExt, SqliteTransactionContext};
use momentum_domain::shared::{DomainError, UserId};
use momentum_domain::streak::{StreakRepository, StreakState};

#[derive(FromRow)]
struct StreakRow {
    user_id: String,
    current_streak: i64,
    longest_streak: i64,
    last_activity_date: Option<NaiveDate>,
    freeze_count: i64,
    freeze_pending_consumption: bool,
    updated_at: DateTime<Utc>,
}

impl StreakRow {
    fn try_into_state(self) -> Result<StreakState, DomainError> {
        StreakState::restore(
            UserId::from_string(&self.user_id),
            to_u32(self.current_streak, "current_streak")?,
            to_u32(self.longest_streak, "longest_streak")?,
            self.last_activity_date,
            to_u32(self.freeze_count, "freeze_count")?,
            self.freeze_pending_consumption,
            self.updated_at,
        )
    }
}

#[async_trait]
impl StreakRepository for SqliteTransactionContext {
    async fn find_streak(&mut self, user_id: &UserId) -> Result<Option<StreakState>, DomainError> {
        let query = r#"
            SELECT user_id, current_streak, longest_streak, last_activity_date,
                   freeze_count, freeze_pending_consumption, updated_at
            FROM streak_states
            WHERE user_id = ?1
        "#;

        let row: Option<StreakRow> = sqlx::query_as(query)
            .bind(user_id.as_str())
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find streak")?;

        row.map(|r| r.try_into_state()).transpose()
    }

    async fn save_streak(&mut self, state: &StreakState) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO streak_states (
                user_id, current_streak, longest_streak, last_activity_date,
                freeze_count, freeze_pending_consumption, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                current_streak = ?2,
                longest_streak = ?3,
                last_activity_date = ?4,
                freeze_count = ?5,
                freeze_pending_consumption = ?6,
                updated_at = ?7
        "#;

        sqlx::query(query)
            .bind(state.user_id().as_str())
            .bind(i64::from(state.current_streak()))
            .bind(i64::from(state.longest_streak()))
            .bind(state.last_activity_date())
            .bind(i64::from(state.freeze_count()))
            .bind(state.freeze_pending_consumption())
            .bind(state.updated_at())
            .execute(self.conn()?)
            .await
            .map_repo_error("Save streak")?;

        Ok(())
    }
}
