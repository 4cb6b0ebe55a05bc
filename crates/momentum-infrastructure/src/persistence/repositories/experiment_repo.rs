use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::persistence::{ResultExt, SqliteTransactionContext};
use momentum_domain::experiment::{Experiment, ExperimentAssignment, ExperimentRepository};
use momentum_domain::shared::{DomainError, UserId};

#[derive(FromRow)]
struct ExperimentRow {
    name: String,
    feature_name: String,
    variants: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl ExperimentRow {
    fn try_into_experiment(self) -> Result<Experiment, DomainError> {
        let variants: Vec<String> = serde_json::from_str(&self.variants).map_err(|e| {
            DomainError::Serialization(format!(
                "Invalid variants for experiment {}: {}",
                self.name, e
            ))
        })?;
        Ok(Experiment::restore(
            self.name,
            self.feature_name,
            variants,
            self.active,
            self.created_at,
        ))
    }
}

#[derive(FromRow)]
struct AssignmentRow {
    user_id: String,
    experiment_name: String,
    feature_name: String,
    variant: String,
    assigned_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn into_assignment(self) -> ExperimentAssignment {
        ExperimentAssignment::restore(
            UserId::from_string(&self.user_id),
            self.experiment_name,
            self.feature_name,
            self.variant,
            self.assigned_at,
        )
    }
}

#[async_trait]
impl ExperimentRepository for SqliteTransactionContext {
    async fn find_assignment(
        &mut self,
        user_id: &UserId,
        feature_name: &str,
    ) -> Result<Option<ExperimentAssignment>, DomainError> {
        let query = r#"
            SELECT user_id, experiment_name, feature_name, variant, assigned_at
            FROM experiment_assignments
            WHERE user_id = ?1 AND feature_name = ?2
        "#;

        let row: Option<AssignmentRow> = sqlx::query_as(query)
            .bind(user_id.as_str())
            .bind(feature_name)
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find experiment assignment")?;

        Ok(row.map(|r| r.into_assignment()))
    }

    async fn insert_assignment_if_absent(
        &mut self,
        assignment: &ExperimentAssignment,
    ) -> Result<bool, DomainError> {
        let query = r#"
            INSERT INTO experiment_assignments (
                user_id, experiment_name, feature_name, variant, assigned_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(assignment.user_id().as_str())
            .bind(assignment.experiment_name())
            .bind(assignment.feature_name())
            .bind(assignment.variant())
            .bind(assignment.assigned_at())
            .execute(self.conn()?)
            .await
            .map_repo_error("Insert experiment assignment")?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_active_experiments(
        &mut self,
        feature_name: &str,
    ) -> Result<Vec<Experiment>, DomainError> {
        let query = r#"
            SELECT name, feature_name, variants, active, created_at
            FROM experiments
            WHERE feature_name = ?1 AND active = 1
            ORDER BY name ASC
        "#;

        let rows: Vec<ExperimentRow> = sqlx::query_as(query)
            .bind(feature_name)
            .fetch_all(self.conn()?)
            .await
            .map_repo_error("List active experiments")?;

        rows.into_iter().map(|r| r.try_into_experiment()).collect()
    }

    async fn find_experiment(&mut self, name: &str) -> Result<Option<Experiment>, DomainError> {
        let query = r#"
            SELECT name, feature_name, variants, active, created_at
            FROM experiments
            WHERE name = ?1
        "#;

        let row: Option<ExperimentRow> = sqlx::query_as(query)
            .bind(name)
            .fetch_optional(self.conn()?)
            .await
            .map_repo_error("Find experiment")?;

        row.map(|r| r.try_into_experiment()).transpose()
    }

    async fn save_experiment(&mut self, experiment: &Experiment) -> Result<(), DomainError> {
        let variants = serde_json::to_string(experiment.variants())
            .map_err(|e| DomainError::Serialization(e.to_string()))?;

        let query = r#"
            INSERT INTO experiments (name, feature_name, variants, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(name) DO UPDATE SET
                feature_name = ?2,
                variants = ?3,
                active = ?4
        "#;

        sqlx::query(query)
            .bind(experiment.name())
            .bind(experiment.feature_name())
            .bind(variants)
            .bind(experiment.is_active())
            .bind(experiment.created_at())
            .execute(self.conn()?)
            .await
            .map_repo_error("Save experiment")?;

        Ok(())
    }
}
