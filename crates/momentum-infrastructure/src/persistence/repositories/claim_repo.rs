use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::persistence::result_ext::{is_unique_violation, map_sqlx_error};
use crate::persistence::{to_i64, to_u32, to_u64, ResultExt, SqliteTransactionContext};
use momentum_domain::claim::{AppliedEffect, ClaimRecord, ClaimRepository};
use momentum_domain::shared::{DomainError, UserId};

#[derive(FromRow)]
struct ClaimRow {
    id: String,
    user_id: String,
    milestone: i64,
    variant: String,
    reward_type: String,
    applied_effect: String,
    claimed_at: DateTime<Utc>,
}

impl ClaimRow {
    fn try_into_claim(self) -> Result<ClaimRecord, DomainError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DomainError::DataIntegrity(format!("Invalid claim id {}: {}", self.id, e)))?;
        let effect: AppliedEffect = serde_json::from_str(&self.applied_effect).map_err(|e| {
            DomainError::Serialization(format!("Invalid applied effect for claim {}: {}", self.id, e))
        })?;

        Ok(ClaimRecord::restore(
            id,
            UserId::from_string(&self.user_id),
            to_u32(self.milestone, "milestone")?,
            self.variant,
            self.reward_type,
            effect,
            self.claimed_at,
        ))
    }
}

const SELECT_CLAIM: &str = r#"
    SELECT id, user_id, milestone, variant, reward_type, applied_effect, claimed_at
    FROM reward_claims
"#;

#[async_trait]
impl ClaimRepository for SqliteTransactionContext {
    async fn find_claim(
        &mut self,
        user_id: &UserId,
        milestone: u32,
    ) -> Result<Option<ClaimRecord>, DomainError> {
        let query = format!("{} WHERE user_id = ?1 AND milestone = ?2", SELECT_CLAIM);

        let row: Option<ClaimRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(i64::from(milestone))
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find claim")?;

        row.map(|r| r.try_into_claim()).transpose()
    }

    async fn insert_claim(&mut self, claim: &ClaimRecord) -> Result<(), DomainError> {
        let effect = serde_json::to_string(claim.applied_effect())
            .map_err(|e| DomainError::Serialization(e.to_string()))?;

        let query = r#"
            INSERT INTO reward_claims (
                id, user_id, milestone, variant, reward_type, applied_effect, claimed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#;

        let result = sqlx::query(query)
            .bind(claim.id().to_string())
            .bind(claim.user_id().as_str())
            .bind(i64::from(claim.milestone()))
            .bind(claim.variant())
            .bind(claim.reward_type())
            .bind(effect)
            .bind(claim.claimed_at())
            .execute(self.conn()?)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::AlreadyClaimed {
                milestone: claim.milestone(),
            }),
            Err(e) => Err(map_sqlx_error(e, "Insert claim")),
        }
    }

    async fn list_claims(
        &mut self,
        user_id: &UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ClaimRecord>, DomainError> {
        let query = format!(
            "{} WHERE user_id = ?1 ORDER BY claimed_at DESC, milestone DESC LIMIT ?2 OFFSET ?3",
            SELECT_CLAIM
        );

        let rows: Vec<ClaimRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(i64::from(limit))
            .bind(to_i64(offset, "offset")?)
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("List claims")?;

        rows.into_iter().map(|r| r.try_into_claim()).collect()
    }

    async fn count_claims(&mut self, user_id: &UserId) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reward_claims WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_one(self.conn()?)
            .await
            .map_repo_error("Count claims")?;

        to_u64(count, "claim count")
    }

    async fn claimed_milestones(&mut self, user_id: &UserId) -> Result<Vec<u32>, DomainError> {
        let rows: Vec<i64> = sqlx::query_scalar(
            "SELECT milestone FROM reward_claims WHERE user_id = ?1 ORDER BY milestone ASC",
        )
        .bind(user_id.as_str())
        .fetch_all(self.conn()?)
        .await
        .map_repo_error("List claimed milestones")?;

        rows.into_iter().map(|m| to_u32(m, "milestone")).collect()
    }
}
