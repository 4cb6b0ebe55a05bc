use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::persistence::{ResultExt, SqliteTransactionContext};
use momentum_domain::ledger::{
    BadgeOrigin, EarnedBadge, LedgerRepository, PointBalance, PointMultiplier, UnlockedTheme,
};
use momentum_domain::shared::{DomainError, UserId};

#[derive(FromRow)]
struct BalanceRow {
    user_id: String,
    balance: i64,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct BadgeRow {
    user_id: String,
    badge_id: String,
    origin: String,
    earned_at: DateTime<Utc>,
}

impl BadgeRow {
    fn try_into_badge(self) -> Result<EarnedBadge, DomainError> {
        Ok(EarnedBadge {
            user_id: UserId::from_string(&self.user_id),
            badge_id: self.badge_id,
            origin: BadgeOrigin::parse(&self.origin)?,
            earned_at: self.earned_at,
        })
    }
}

#[derive(FromRow)]
struct ThemeRow {
    user_id: String,
    theme_id: String,
    unlocked_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MultiplierRow {
    user_id: String,
    factor: f64,
    source: String,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl LedgerRepository for SqliteTransactionContext {
    async fn find_balance(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<PointBalance>, DomainError> {
        let row: Option<BalanceRow> = sqlx::query_as(
            "SELECT user_id, balance, updated_at FROM point_balances WHERE user_id = ?1",
        )
        .bind(user_id.as_str())
        .fetch_optional(self.conn()?)
        .await
        .map_repo_error("Find point balance")?;

        row.map(|r| PointBalance::restore(UserId::from_string(&r.user_id), r.balance, r.updated_at))
            .transpose()
    }

    async fn save_balance(&mut self, balance: &PointBalance) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO point_balances (user_id, balance, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                balance = ?2,
                updated_at = ?3
        "#;

        sqlx::query(query)
            .bind(balance.user_id().as_str())
            .bind(balance.balance())
            .bind(balance.updated_at())
            .execute(self.conn()?)
            .await
            .map_repo_error("Save point balance")?;

        Ok(())
    }

    async fn insert_badge_if_absent(&mut self, badge: &EarnedBadge) -> Result<bool, DomainError> {
        let query = r#"
            INSERT INTO earned_badges (user_id, badge_id, origin, earned_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, badge_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(badge.user_id.as_str())
            .bind(&badge.badge_id)
            .bind(badge.origin.as_str())
            .bind(badge.earned_at)
            .execute(self.conn()?)
            .await
            .map_repo_error("Insert badge")?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_badges(&mut self, user_id: &UserId) -> Result<Vec<EarnedBadge>, DomainError> {
        let rows: Vec<BadgeRow> = sqlx::query_as(
            r#"
            SELECT user_id, badge_id, origin, earned_at
            FROM earned_badges
            WHERE user_id = ?1
            ORDER BY earned_at ASC, badge_id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(self.conn()?)
        .await
        .map_repo_error("List badges")?;

        rows.into_iter().map(|r| r.try_into_badge()).collect()
    }

    async fn insert_theme_if_absent(
        &mut self,
        theme: &UnlockedTheme,
    ) -> Result<bool, DomainError> {
        let query = r#"
            INSERT INTO unlocked_themes (user_id, theme_id, unlocked_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, theme_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(theme.user_id.as_str())
            .bind(&theme.theme_id)
            .bind(theme.unlocked_at)
            .execute(self.conn()?)
            .await
            .map_repo_error("Insert theme")?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_themes(&mut self, user_id: &UserId) -> Result<Vec<UnlockedTheme>, DomainError> {
        let rows: Vec<ThemeRow> = sqlx::query_as(
            r#"
            SELECT user_id, theme_id, unlocked_at
            FROM unlocked_themes
            WHERE user_id = ?1
            ORDER BY unlocked_at ASC, theme_id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(self.conn()?)
        .await
        .map_repo_error("List themes")?;

        Ok(rows
            .into_iter()
            .map(|r| UnlockedTheme {
                user_id: UserId::from_string(&r.user_id),
                theme_id: r.theme_id,
                unlocked_at: r.unlocked_at,
            })
            .collect())
    }

    async fn insert_multiplier(
        &mut self,
        multiplier: &PointMultiplier,
    ) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO point_multipliers (user_id, factor, source, granted_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        "#;

        sqlx::query(query)
            .bind(multiplier.user_id.as_str())
            .bind(multiplier.factor)
            .bind(&multiplier.source)
            .bind(multiplier.granted_at)
            .bind(multiplier.expires_at)
            .execute(self.conn()?)
            .await
            .map_repo_error("Insert multiplier")?;

        Ok(())
    }

    async fn active_multipliers(
        &mut self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PointMultiplier>, DomainError> {
        let rows: Vec<MultiplierRow> = sqlx::query_as(
            r#"
            SELECT user_id, factor, source, granted_at, expires_at
            FROM point_multipliers
            WHERE user_id = ?1
            ORDER BY granted_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(self.conn()?)
        .await
        .map_repo_error("List multipliers")?;

        // Timestamps are compared as values, not as stored text
        Ok(rows
            .into_iter()
            .map(|r| PointMultiplier {
                user_id: UserId::from_string(&r.user_id),
                factor: r.factor,
                source: r.source,
                granted_at: r.granted_at,
                expires_at: r.expires_at,
            })
            .filter(|m| m.is_active(now))
            .collect())
    }
}
