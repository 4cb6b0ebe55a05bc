use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::persistence::{to_i64, to_u32, to_u64, ResultExt, SqliteTransactionContext};
use momentum_domain::activity::{ActivityLogRepository, ActivityTotals, DailyActivityRecord};
use momentum_domain::shared::{DomainError, UserId};

#[derive(FromRow)]
struct ActivityRow {
    user_id: String,
    activity_date: NaiveDate,
    practice_seconds: i64,
    characters_typed: i64,
    words_typed: i64,
    average_wpm: f64,
    average_accuracy: f64,
    session_count: i64,
    updated_at: DateTime<Utc>,
}

impl ActivityRow {
    fn try_into_record(self) -> Result<DailyActivityRecord, DomainError> {
        Ok(DailyActivityRecord::restore(
            UserId::from_string(&self.user_id),
            self.activity_date,
            to_u64(self.practice_seconds, "practice_seconds")?,
            to_u64(self.characters_typed, "characters_typed")?,
            to_u64(self.words_typed, "words_typed")?,
            self.average_wpm,
            self.average_accuracy,
            to_u32(self.session_count, "session_count")?,
            self.updated_at,
        ))
    }
}

#[derive(FromRow)]
struct TotalsRow {
    active_days: i64,
    practice_seconds: Option<i64>,
    words_typed: Option<i64>,
    best_daily_wpm: Option<f64>,
    average_accuracy: Option<f64>,
}

const SELECT_ACTIVITY: &str = r#"
    SELECT user_id, activity_date, practice_seconds, characters_typed, words_typed,
           average_wpm, average_accuracy, session_count, updated_at
    FROM daily_activity
"#;

#[async_trait]
impl ActivityLogRepository for SqliteTransactionContext {
    async fn find_activity(
        &mut self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivityRecord>, DomainError> {
        let query = format!("{} WHERE user_id = ?1 AND activity_date = ?2", SELECT_ACTIVITY);

        let row: Option<ActivityRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(date)
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find activity")?;

        row.map(|r| r.try_into_record()).transpose()
    }

    async fn save_activity(&mut self, record: &DailyActivityRecord) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO daily_activity (
                user_id, activity_date, practice_seconds, characters_typed, words_typed,
                average_wpm, average_accuracy, session_count, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(user_id, activity_date) DO UPDATE SET
                practice_seconds = ?3,
                characters_typed = ?4,
                words_typed = ?5,
                average_wpm = ?6,
                average_accuracy = ?7,
                session_count = ?8,
                updated_at = ?9
        "#;

        sqlx::query(query)
            .bind(record.user_id().as_str())
            .bind(record.date())
            .bind(to_i64(record.practice_seconds(), "practice_seconds")?)
            .bind(to_i64(record.characters_typed(), "characters_typed")?)
            .bind(to_i64(record.words_typed(), "words_typed")?)
            .bind(record.average_wpm())
            .bind(record.average_accuracy())
            .bind(i64::from(record.session_count()))
            .bind(record.updated_at())
            .execute(self.conn()?)
            .await
            .map_repo_error("Save activity")?;

        Ok(())
    }

    async fn list_activity(
        &mut self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivityRecord>, DomainError> {
        let query = format!(
            "{} WHERE user_id = ?1 AND activity_date >= ?2 AND activity_date <= ?3 ORDER BY activity_date ASC",
            SELECT_ACTIVITY
        );

        let rows: Vec<ActivityRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("List activity")?;

        rows.into_iter().map(|r| r.try_into_record()).collect()
    }

    async fn activity_totals(&mut self, user_id: &UserId) -> Result<ActivityTotals, DomainError> {
        let query = r#"
            SELECT
                COUNT(*) AS active_days,
                SUM(practice_seconds) AS practice_seconds,
                SUM(words_typed) AS words_typed,
                MAX(average_wpm) AS best_daily_wpm,
                AVG(average_accuracy) AS average_accuracy
            FROM daily_activity
            WHERE user_id = ?1
        "#;

        let row: TotalsRow = sqlx::query_as(query)
            .bind(user_id.as_str())
            .fetch_one(self.conn()?)
            .await
            .map_repo_error("Aggregate activity")?;

        Ok(ActivityTotals {
            active_days: to_u32(row.active_days, "active_days")?,
            practice_seconds: to_u64(row.practice_seconds.unwrap_or(0), "practice_seconds")?,
            words_typed: to_u64(row.words_typed.unwrap_or(0), "words_typed")?,
            best_daily_wpm: row.best_daily_wpm.unwrap_or(0.0),
            average_accuracy: row.average_accuracy.unwrap_or(0.0),
        })
    }
}
