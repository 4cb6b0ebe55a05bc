use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::persistence::{to_u32, to_u64, ResultExt, SqliteTransactionContext};
use momentum_domain::reward::{
    MultiplierRange, RewardCatalog, RewardCatalogRepository, RewardDefinition, RewardKind,
    SurpriseRoll, SurpriseRollRepository,
};
use momentum_domain::shared::{DomainError, UserId};

#[derive(FromRow)]
struct RewardRow {
    variant: String,
    milestone: i64,
    reward_type: String,
    reward_value: String,
    description: String,
    probability: f64,
    multiplier_min: Option<f64>,
    multiplier_max: Option<f64>,
}

impl RewardRow {
    fn try_into_definition(self) -> Result<RewardDefinition, DomainError> {
        let kind = RewardKind::from_parts(&self.reward_type, &self.reward_value)?;
        let range = match (self.multiplier_min, self.multiplier_max) {
            (Some(min), Some(max)) => Some(MultiplierRange::new(min, max).map_err(|e| {
                DomainError::DataIntegrity(format!(
                    "Reward {}/{}: {}",
                    self.variant,
                    self.milestone,
                    e.message()
                ))
            })?),
            (None, None) => None,
            _ => {
                return Err(DomainError::DataIntegrity(format!(
                    "Reward {}/{} has a half-open multiplier range",
                    self.variant, self.milestone
                )))
            }
        };

        Ok(RewardDefinition::restore(
            self.variant,
            to_u32(self.milestone, "milestone")?,
            kind,
            self.description,
            self.probability,
            range,
        ))
    }
}

#[derive(FromRow)]
struct RollRow {
    user_id: String,
    roll_date: NaiveDate,
    milestone: i64,
    roll_value: f64,
    fired: bool,
    multiplier: Option<f64>,
    rolled_at: DateTime<Utc>,
}

impl RollRow {
    fn try_into_roll(self) -> Result<SurpriseRoll, DomainError> {
        Ok(SurpriseRoll::restore(
            UserId::from_string(&self.user_id),
            self.roll_date,
            to_u32(self.milestone, "milestone")?,
            self.roll_value,
            self.fired,
            self.multiplier,
            self.rolled_at,
        ))
    }
}

#[async_trait]
impl RewardCatalogRepository for SqliteTransactionContext {
    async fn load_catalog(&mut self, variant: &str) -> Result<RewardCatalog, DomainError> {
        let query = r#"
            SELECT variant, milestone, reward_type, reward_value, description,
                   probability, multiplier_min, multiplier_max
            FROM reward_definitions
            WHERE variant = ?1
            ORDER BY milestone ASC, is_surprise ASC
        "#;

        let rows: Vec<RewardRow> = sqlx::query_as(query)
            .bind(variant)
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("Load reward catalog")?;

        let definitions = rows
            .into_iter()
            .map(|r| r.try_into_definition())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RewardCatalog::new(variant, definitions))
    }

    async fn save_reward(&mut self, definition: &RewardDefinition) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO reward_definitions (
                variant, milestone, reward_type, reward_value, description,
                is_surprise, probability, multiplier_min, multiplier_max
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(variant, milestone, is_surprise) DO UPDATE SET
                reward_type = ?3,
                reward_value = ?4,
                description = ?5,
                probability = ?7,
                multiplier_min = ?8,
                multiplier_max = ?9
        "#;

        let range = definition.multiplier_range();
        sqlx::query(query)
            .bind(definition.variant())
            .bind(i64::from(definition.milestone()))
            .bind(definition.kind().type_name())
            .bind(definition.kind().value())
            .bind(definition.description())
            .bind(definition.is_surprise())
            .bind(definition.probability())
            .bind(range.map(|r| r.min()))
            .bind(range.map(|r| r.max()))
            .execute(self.conn()?)
            .await
            .map_repo_error("Save reward definition")?;

        Ok(())
    }

    async fn count_rewards(&mut self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reward_definitions")
            .fetch_one(self.conn()?)
            .await
            .map_repo_error("Count reward definitions")?;

        to_u64(count, "reward count")
    }
}

const SELECT_ROLL: &str = r#"
    SELECT user_id, roll_date, milestone, roll_value, fired, multiplier, rolled_at
    FROM surprise_rolls
"#;

#[async_trait]
impl SurpriseRollRepository for SqliteTransactionContext {
    async fn find_latest_roll(
        &mut self,
        user_id: &UserId,
        milestone: u32,
    ) -> Result<Option<SurpriseRoll>, DomainError> {
        let query = format!(
            "{} WHERE user_id = ?1 AND milestone = ?2 ORDER BY roll_date DESC LIMIT 1",
            SELECT_ROLL
        );

        let row: Option<RollRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(i64::from(milestone))
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find latest surprise roll")?;

        row.map(|r| r.try_into_roll()).transpose()
    }

    async fn insert_roll(&mut self, roll: &SurpriseRoll) -> Result<bool, DomainError> {
        let query = r#"
            INSERT INTO surprise_rolls (
                user_id, roll_date, milestone, roll_value, fired, multiplier, rolled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, roll_date, milestone) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(roll.user_id().as_str())
            .bind(roll.roll_date())
            .bind(i64::from(roll.milestone()))
            .bind(roll.roll_value())
            .bind(roll.fired())
            .bind(roll.multiplier())
            .bind(roll.rolled_at())
            .execute(self.conn()?)
            .await
            .map_repo_error("Insert surprise roll")?;

        Ok(result.rows_affected() == 1)
    }
}
