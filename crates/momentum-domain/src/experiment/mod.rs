mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::shared::{DomainError, RandomSource, UserId};

pub use repository::ExperimentRepository;

/// Variant every user falls back to when no experiment is running
pub const DEFAULT_VARIANT: &str = "control";

/// Feature name under which reward-structure experiments run
pub const STREAKS_FEATURE: &str = "streaks";

/// A named experiment over one feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    name: String,
    feature_name: String,
    variants: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Experiment {
    pub fn new(
        name: &str,
        feature_name: &str,
        variants: Vec<String>,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation(
                "Experiment name cannot be empty".to_string(),
            ));
        }
        if feature_name.trim().is_empty() {
            return Err(DomainError::Validation(
                "Feature name cannot be empty".to_string(),
            ));
        }
        if variants.is_empty() {
            return Err(DomainError::Validation(format!(
                "Experiment '{}' needs at least one variant",
                name
            )));
        }
        let mut seen = HashSet::new();
        for variant in &variants {
            if variant.trim().is_empty() || !seen.insert(variant.as_str()) {
                return Err(DomainError::Validation(format!(
                    "Experiment '{}' has an empty or duplicate variant '{}'",
                    name, variant
                )));
            }
        }

        Ok(Self {
            name: name.trim().to_string(),
            feature_name: feature_name.trim().to_string(),
            variants,
            active,
            created_at: now,
        })
    }

    pub fn restore(
        name: String,
        feature_name: String,
        variants: Vec<String>,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            feature_name,
            variants,
            active,
            created_at,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Sticky bucketing of a user into one experiment's variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentAssignment {
    user_id: UserId,
    experiment_name: String,
    feature_name: String,
    variant: String,
    assigned_at: DateTime<Utc>,
}

impl ExperimentAssignment {
    pub fn restore(
        user_id: UserId,
        experiment_name: String,
        feature_name: String,
        variant: String,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            experiment_name,
            feature_name,
            variant,
            assigned_at,
        }
    }

    /// Pick an experiment, then one of its variants, uniformly at random.
    /// Fails with `ExperimentInactive` when nothing is running for the feature.
    pub fn choose(
        user_id: &UserId,
        feature_name: &str,
        active: &[Experiment],
        rng: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let candidates: Vec<&Experiment> = active
            .iter()
            .filter(|e| e.is_active() && !e.variants().is_empty())
            .collect();
        if candidates.is_empty() {
            return Err(DomainError::ExperimentInactive(feature_name.to_string()));
        }

        let experiment = candidates[rng.pick_index(candidates.len())];
        let variant = &experiment.variants()[rng.pick_index(experiment.variants().len())];

        Ok(Self {
            user_id: user_id.clone(),
            experiment_name: experiment.name().to_string(),
            feature_name: feature_name.to_string(),
            variant: variant.clone(),
            assigned_at: now,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<f64>>);

    impl RandomSource for Scripted {
        fn next_f64(&self) -> f64 {
            self.0.lock().unwrap().remove(0)
        }
    }

    fn experiment(name: &str, variants: &[&str]) -> Experiment {
        Experiment::new(
            name,
            STREAKS_FEATURE,
            variants.iter().map(|v| v.to_string()).collect(),
            true,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_choose_picks_experiment_then_variant() {
        let active = vec![
            experiment("reward-ladder", &["control", "variant_a"]),
            experiment("surprise-rate", &["low", "high"]),
        ];
        let rng = Scripted(Mutex::new(vec![0.75, 0.1]));

        let assignment = ExperimentAssignment::choose(
            &UserId::from_string("u"),
            STREAKS_FEATURE,
            &active,
            &rng,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(assignment.experiment_name(), "surprise-rate");
        assert_eq!(assignment.variant(), "low");
        assert_eq!(assignment.feature_name(), STREAKS_FEATURE);
    }

    #[test]
    fn test_choose_without_active_experiments_is_inactive() {
        let mut paused = experiment("reward-ladder", &["control", "variant_a"]);
        paused.set_active(false);
        let rng = Scripted(Mutex::new(vec![]));

        let result = ExperimentAssignment::choose(
            &UserId::from_string("u"),
            STREAKS_FEATURE,
            &[paused],
            &rng,
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(DomainError::ExperimentInactive(STREAKS_FEATURE.to_string()))
        );
    }

    #[test]
    fn test_new_experiment_rejects_duplicate_variants() {
        let result = Experiment::new(
            "dup",
            STREAKS_FEATURE,
            vec!["a".to_string(), "a".to_string()],
            true,
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(Experiment::new("none", STREAKS_FEATURE, vec![], true, Utc::now()).is_err());
    }
}
