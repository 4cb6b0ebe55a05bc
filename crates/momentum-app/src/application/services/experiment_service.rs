use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::transaction::{finish, with_conflict_retry};
use momentum_domain::experiment::{Experiment, ExperimentAssignment, DEFAULT_VARIANT};
use momentum_domain::shared::{Clock, DomainError, RandomSource, UserId};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};

/// Sticky variant of a user for a feature.
///
/// An existing assignment always wins. Without an active experiment the user
/// falls back to the default variant and nothing is persisted. Otherwise an
/// experiment and a variant are drawn uniformly and inserted with
/// "do nothing on conflict"; whoever lost the race reads the winner back.
pub(crate) async fn resolve_variant(
    tx: &mut dyn EngagementTransaction,
    user_id: &UserId,
    feature_name: &str,
    rng: &dyn RandomSource,
    now: DateTime<Utc>,
) -> Result<String, DomainError> {
    if let Some(existing) = tx.find_assignment(user_id, feature_name).await? {
        return Ok(existing.variant().to_string());
    }

    let active = tx.list_active_experiments(feature_name).await?;
    let assignment = match ExperimentAssignment::choose(user_id, feature_name, &active, rng, now) {
        Ok(assignment) => assignment,
        Err(DomainError::ExperimentInactive(_)) => {
            debug!(
                "[experiment] No active experiment for '{}', {} uses '{}'",
                feature_name, user_id, DEFAULT_VARIANT
            );
            return Ok(DEFAULT_VARIANT.to_string());
        }
        Err(e) => return Err(e),
    };

    if tx.insert_assignment_if_absent(&assignment).await? {
        info!(
            "[experiment] Assigned {} to '{}' variant '{}' for '{}'",
            user_id,
            assignment.experiment_name(),
            assignment.variant(),
            feature_name
        );
        return Ok(assignment.variant().to_string());
    }

    match tx.find_assignment(user_id, feature_name).await? {
        Some(winner) => Ok(winner.variant().to_string()),
        None => Err(DomainError::TransactionConflict(format!(
            "Assignment of {} for '{}' lost a race but no winner is visible",
            user_id, feature_name
        ))),
    }
}

pub struct ExperimentService {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
}

impl ExperimentService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self { uow, clock, rng }
    }

    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_variant(
        &self,
        user_id: &UserId,
        feature_name: &str,
    ) -> Result<String, DomainError> {
        let feature_name = feature_name.trim();
        if feature_name.is_empty() {
            return Err(DomainError::InvalidInput(
                "Feature name cannot be empty".to_string(),
            ));
        }
        with_conflict_retry("get_variant", || self.get_variant_once(user_id, feature_name)).await
    }

    async fn get_variant_once(
        &self,
        user_id: &UserId,
        feature_name: &str,
    ) -> Result<String, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = resolve_variant(tx.as_mut(), user_id, feature_name, self.rng.as_ref(), now).await;
        finish(tx, result).await
    }

    /// Create or redefine an experiment. Existing assignments are kept.
    #[instrument(skip(self, variants))]
    pub async fn register_experiment(
        &self,
        name: &str,
        feature_name: &str,
        variants: Vec<String>,
        active: bool,
    ) -> Result<Experiment, DomainError> {
        let now = self.clock.now();
        let candidate = Experiment::new(name, feature_name, variants, active, now)?;

        let mut tx = self.uow.begin().await?;
        let result = async {
            let existing = tx.find_experiment(candidate.name()).await?;
            let experiment = match existing {
                Some(existing) => Experiment::restore(
                    candidate.name().to_string(),
                    candidate.feature_name().to_string(),
                    candidate.variants().to_vec(),
                    candidate.is_active(),
                    existing.created_at(),
                ),
                None => candidate,
            };
            tx.save_experiment(&experiment).await?;
            info!(
                "[experiment] Registered '{}' on '{}' with variants {:?} (active: {})",
                experiment.name(),
                experiment.feature_name(),
                experiment.variants(),
                experiment.is_active()
            );
            Ok::<_, DomainError>(experiment)
        }
        .await;
        finish(tx, result).await
    }

    /// Toggle an experiment. Deactivation stops new assignments only.
    #[instrument(skip(self))]
    pub async fn set_experiment_active(
        &self,
        name: &str,
        active: bool,
    ) -> Result<Experiment, DomainError> {
        let mut tx = self.uow.begin().await?;
        let result = async {
            let mut experiment = tx
                .find_experiment(name)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("Experiment '{}'", name)))?;
            experiment.set_active(active);
            tx.save_experiment(&experiment).await?;
            info!("[experiment] '{}' active: {}", name, active);
            Ok::<_, DomainError>(experiment)
        }
        .await;
        finish(tx, result).await
    }
}
