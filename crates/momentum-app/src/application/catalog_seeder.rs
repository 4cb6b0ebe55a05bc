use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::application::services::finish;
use crate::application::ResultExt;
use momentum_domain::experiment::Experiment;
use momentum_domain::reward::{MultiplierRange, RewardDefinition, RewardKind};
use momentum_domain::shared::DomainError;
use momentum_domain::store::UnitOfWork;

#[derive(Debug, Deserialize)]
struct DefaultExperimentConfig {
    name: String,
    feature: String,
    variants: Vec<String>,
    active: bool,
}

#[derive(Debug, Deserialize)]
struct SurpriseConfig {
    probability: f64,
    multiplier_min: Option<f64>,
    multiplier_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DefaultRewardConfig {
    variant: String,
    milestone: u32,
    description: String,
    reward: Option<RewardKind>,
    surprise: Option<SurpriseConfig>,
}

#[derive(Debug, Deserialize)]
struct DefaultCatalogConfig {
    experiment: DefaultExperimentConfig,
    rewards: Vec<DefaultRewardConfig>,
}

fn default_catalog_config() -> Result<DefaultCatalogConfig, DomainError> {
    const RAW_CONFIG: &str = include_str!("../../../../config/rewards/default_catalog.json");
    serde_json::from_str(RAW_CONFIG).to_serialization_err("default reward catalog")
}

impl DefaultRewardConfig {
    fn to_definition(&self) -> Result<RewardDefinition, DomainError> {
        match (&self.reward, &self.surprise) {
            (Some(kind), None) => RewardDefinition::regular(
                &self.variant,
                self.milestone,
                kind.clone(),
                &self.description,
            ),
            (None, Some(surprise)) => {
                let range = match (surprise.multiplier_min, surprise.multiplier_max) {
                    (Some(min), Some(max)) => Some(MultiplierRange::new(min, max)?),
                    (None, None) => None,
                    _ => {
                        return Err(DomainError::Validation(format!(
                            "Surprise at {} / {} needs both multiplier bounds or neither",
                            self.variant, self.milestone
                        )))
                    }
                };
                RewardDefinition::surprise(
                    &self.variant,
                    self.milestone,
                    &self.description,
                    surprise.probability,
                    range,
                )
            }
            _ => Err(DomainError::Validation(format!(
                "Catalog entry {} / {} must define exactly one of 'reward' or 'surprise'",
                self.variant, self.milestone
            ))),
        }
    }
}

/// Every definition of the bundled catalog, validated
pub fn default_reward_definitions() -> Result<Vec<RewardDefinition>, DomainError> {
    default_catalog_config()?
        .rewards
        .iter()
        .map(DefaultRewardConfig::to_definition)
        .collect()
}

/// Load the bundled reward catalog into an empty store and register the
/// default streak experiment when it is missing. Existing data is never
/// overwritten.
pub async fn seed_default_catalog(
    uow: &dyn UnitOfWork,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let config = default_catalog_config()?;
    let definitions = config
        .rewards
        .iter()
        .map(DefaultRewardConfig::to_definition)
        .collect::<Result<Vec<_>, _>>()?;
    let experiment = Experiment::new(
        &config.experiment.name,
        &config.experiment.feature,
        config.experiment.variants.clone(),
        config.experiment.active,
        now,
    )?;

    let mut tx = uow.begin().await?;
    let result = async {
        if tx.count_rewards().await? == 0 {
            for definition in &definitions {
                tx.save_reward(definition).await?;
            }
            info!(
                "[seed] Seeded {} default reward(s) from config",
                definitions.len()
            );
        }

        if tx.find_experiment(experiment.name()).await?.is_none() {
            tx.save_experiment(&experiment).await?;
            info!(
                "[seed] Registered default experiment '{}' on '{}'",
                experiment.name(),
                experiment.feature_name()
            );
        }
        Ok::<_, DomainError>(())
    }
    .await;
    finish(tx, result).await
}
