use std::sync::Arc;

use crate::application::services::{
    ClaimService, ExperimentService, FreezeService, LedgerService, NotificationService,
    RewardService, StreakService, SweepScheduler,
};
use crate::presentation::facade::EngagementFacade;
use momentum_domain::shared::{Clock, RandomSource};
use momentum_domain::store::UnitOfWork;
use momentum_infrastructure::{Database, EngagementConfig};

pub struct Runtime {
    /// `None` when the engine runs on the in-memory store
    pub database: Option<Arc<Database>>,
    pub uow: Arc<dyn UnitOfWork>,
    pub clock: Arc<dyn Clock>,
    pub rng: Arc<dyn RandomSource>,
    pub config: EngagementConfig,
}

#[derive(Clone)]
pub struct Services {
    pub streak: Arc<StreakService>,
    pub freeze: Arc<FreezeService>,
    pub experiment: Arc<ExperimentService>,
    pub reward: Arc<RewardService>,
    pub claim: Arc<ClaimService>,
    pub ledger: Arc<LedgerService>,
    pub notification: Arc<NotificationService>,
}

pub struct AppState {
    pub runtime: Runtime,
    pub services: Services,
    pub facade: EngagementFacade,
    pub sweep: Arc<SweepScheduler>,
}

impl AppState {
    pub async fn new(config: EngagementConfig) -> anyhow::Result<Self> {
        crate::presentation::bootstrap::build_app_state(config).await
    }

    /// Stop background work and release the store
    pub async fn shutdown(&self) {
        self.sweep.shutdown().await;
        if let Some(database) = &self.runtime.database {
            database.close().await;
        }
    }
}
