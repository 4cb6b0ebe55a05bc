use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::persistence::{ResultExt, SqliteTransactionContext};
use momentum_domain::freeze::{
    FreezeRepository, FreezeSource, FreezeStatus, NewFreeze, StreakFreeze,
};
use momentum_domain::shared::{DomainError, UserId};

#[derive(FromRow)]
struct FreezeRow {
    id: i64,
    user_id: String,
    source: String,
    status: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    used_at: Option<DateTime<Utc>>,
    protected_date: Option<NaiveDate>,
}

impl FreezeRow {
    fn try_into_freeze(self) -> Result<StreakFreeze, DomainError> {
        Ok(StreakFreeze::restore(
            self.id,
            UserId::from_string(&self.user_id),
            FreezeSource::parse(&self.source)?,
            FreezeStatus::parse(&self.status)?,
            self.granted_at,
            self.expires_at,
            self.used_at,
            self.protected_date,
        ))
    }
}

const SELECT_FREEZE: &str = r#"
    SELECT id, user_id, source, status, granted_at, expires_at, used_at, protected_date
    FROM streak_freezes
"#;

#[async_trait]
impl FreezeRepository for SqliteTransactionContext {
    async fn insert_freeze(&mut self, freeze: &NewFreeze) -> Result<StreakFreeze, DomainError> {
        let query = r#"
            INSERT INTO streak_freezes (user_id, source, status, granted_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        "#;

        let result = sqlx::query(query)
            .bind(freeze.user_id.as_str())
            .bind(freeze.source.as_str())
            .bind(FreezeStatus::Available.as_str())
            .bind(freeze.granted_at)
            .bind(freeze.expires_at)
            .execute(self.conn()?)
            .await
            .map_repo_error("Insert freeze")?;

        Ok(StreakFreeze::restore(
            result.last_insert_rowid(),
            freeze.user_id.clone(),
            freeze.source,
            FreezeStatus::Available,
            freeze.granted_at,
            freeze.expires_at,
            None,
            None,
        ))
    }

    async fn find_freeze(&mut self, id: i64) -> Result<Option<StreakFreeze>, DomainError> {
        let query = format!("{} WHERE id = ?1", SELECT_FREEZE);

        let row: Option<FreezeRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find freeze")?;

        row.map(|r| r.try_into_freeze()).transpose()
    }

    async fn list_freezes(&mut self, user_id: &UserId) -> Result<Vec<StreakFreeze>, DomainError> {
        let query = format!(
            "{} WHERE user_id = ?1 ORDER BY granted_at DESC, id DESC",
            SELECT_FREEZE
        );

        let rows: Vec<FreezeRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("List freezes")?;

        rows.into_iter().map(|r| r.try_into_freeze()).collect()
    }

    async fn list_available_freezes(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<StreakFreeze>, DomainError> {
        let query = format!(
            "{} WHERE user_id = ?1 AND status = 'available' ORDER BY granted_at ASC, id ASC",
            SELECT_FREEZE
        );

        let rows: Vec<FreezeRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("List available freezes")?;

        rows.into_iter().map(|r| r.try_into_freeze()).collect()
    }

    async fn update_freeze(&mut self, freeze: &StreakFreeze) -> Result<(), DomainError> {
        let query = r#"
            UPDATE streak_freezes
            SET status = ?2, used_at = ?3, protected_date = ?4
            WHERE id = ?1
        "#;

        let result = sqlx::query(query)
            .bind(freeze.id())
            .bind(freeze.status().as_str())
            .bind(freeze.used_at())
            .bind(freeze.protected_date())
            .execute(self.conn()?)
            .await
            .map_repo_error("Update freeze")?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("Freeze {}", freeze.id())));
        }
        Ok(())
    }

    async fn expire_stale_freezes(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<StreakFreeze>, DomainError> {
        let query = format!(
            "{} WHERE status = 'available' AND expires_at IS NOT NULL",
            SELECT_FREEZE
        );

        let rows: Vec<FreezeRow> = sqlx::query_as(&query)
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("Find expiring freezes")?;

        let mut expired = Vec::new();
        for row in rows {
            let mut freeze = row.try_into_freeze()?;
            if !freeze.is_past_expiry(now) {
                continue;
            }
            freeze.mark_expired();
            sqlx::query("UPDATE streak_freezes SET status = ?2 WHERE id = ?1")
                .bind(freeze.id())
                .bind(freeze.status().as_str())
                .execute(self.conn()?)
                .await
                .map_repo_error("Expire freeze")?;
            expired.push(freeze);
        }

        Ok(expired)
    }
}
