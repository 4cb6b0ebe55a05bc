use async_trait::async_trait;

use super::{Experiment, ExperimentAssignment};
use crate::shared::{DomainError, UserId};

#[async_trait]
pub trait ExperimentRepository: Send {
    /// Sticky assignment of a user for a feature, if any
    async fn find_assignment(
        &mut self,
        user_id: &UserId,
        feature_name: &str,
    ) -> Result<Option<ExperimentAssignment>, DomainError>;

    /// Uniqueness-guarded insert. Returns `false` when another writer already
    /// assigned this user for the experiment or feature.
    async fn insert_assignment_if_absent(
        &mut self,
        assignment: &ExperimentAssignment,
    ) -> Result<bool, DomainError>;

    /// Active experiments for a feature, ordered by name
    async fn list_active_experiments(
        &mut self,
        feature_name: &str,
    ) -> Result<Vec<Experiment>, DomainError>;

    async fn find_experiment(&mut self, name: &str) -> Result<Option<Experiment>, DomainError>;

    /// Upsert keyed by experiment name
    async fn save_experiment(&mut self, experiment: &Experiment) -> Result<(), DomainError>;
}
