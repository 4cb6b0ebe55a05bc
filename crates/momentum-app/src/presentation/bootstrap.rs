use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::application::catalog_seeder::seed_default_catalog;
use crate::application::services::{
    badge_set, ClaimService, ExperimentService, FreezeService, LedgerService, NotificationService,
    RewardService, StreakService, SweepJob, SweepScheduler, SweepSettings,
};
use crate::presentation::facade::EngagementFacade;
use crate::presentation::state::{AppState, Runtime, Services};
use momentum_domain::shared::{Clock, RandomSource};
use momentum_domain::store::UnitOfWork;
use momentum_infrastructure::config::TimeoutConfig;
use momentum_infrastructure::notification::create_notifier;
use momentum_infrastructure::{
    Database, EngagementConfig, SqliteUnitOfWork, SystemClock, ThreadRandom,
};

/// Open the SQLite store described by `config` and wire the engine on top
pub async fn build_app_state(config: EngagementConfig) -> anyhow::Result<AppState> {
    let startup_started_at = Instant::now();

    let db_path = config.database_url_path();
    info!("Database path: {}", db_path);

    info!("🔌 Connecting to database...");
    let started_at = Instant::now();
    let database = Database::new(&db_path).await?;
    info!(
        "✓ Database connection established ({}ms)",
        started_at.elapsed().as_millis()
    );

    info!("🔄 Running migrations...");
    let started_at = Instant::now();
    database.run_migrations().await?;
    info!(
        "✓ Migrations completed ({}ms)",
        started_at.elapsed().as_millis()
    );

    let uow = Arc::new(SqliteUnitOfWork::new(database.shared_pool())) as Arc<dyn UnitOfWork>;
    let clock =
        Arc::new(SystemClock::with_offset_minutes(config.utc_offset_minutes)?) as Arc<dyn Clock>;
    let rng = Arc::new(ThreadRandom) as Arc<dyn RandomSource>;

    let state = assemble_app_state(Runtime {
        database: Some(Arc::new(database)),
        uow,
        clock,
        rng,
        config,
    })
    .await?;

    info!(
        "✓ Engine ready ({}ms total)",
        startup_started_at.elapsed().as_millis()
    );
    Ok(state)
}

/// Seed defaults, build the services and start the sweep for an already
/// opened store
pub async fn assemble_app_state(runtime: Runtime) -> anyhow::Result<AppState> {
    let config = &runtime.config;

    info!("🌱 Seeding default reward catalog...");
    let started_at = Instant::now();
    seed_default_catalog(runtime.uow.as_ref(), runtime.clock.now()).await?;
    info!(
        "✓ Default reward catalog seeded ({}ms)",
        started_at.elapsed().as_millis()
    );

    let notification = Arc::new(NotificationService::new(vec![create_notifier(config)?]));
    let services = Services {
        streak: Arc::new(StreakService::new(
            runtime.uow.clone(),
            runtime.clock.clone(),
            badge_set(config.custom_badges.clone()),
        )),
        freeze: Arc::new(FreezeService::new(
            runtime.uow.clone(),
            runtime.clock.clone(),
            config.freeze_policy(),
        )),
        experiment: Arc::new(ExperimentService::new(
            runtime.uow.clone(),
            runtime.clock.clone(),
            runtime.rng.clone(),
        )),
        reward: Arc::new(RewardService::new(
            runtime.uow.clone(),
            runtime.clock.clone(),
            runtime.rng.clone(),
            config.milestone_step,
        )),
        claim: Arc::new(ClaimService::new(
            runtime.uow.clone(),
            runtime.clock.clone(),
            runtime.rng.clone(),
            config.freeze_policy(),
            config.surprise.clone(),
            config.milestone_step,
        )),
        ledger: Arc::new(LedgerService::new(
            runtime.uow.clone(),
            runtime.clock.clone(),
        )),
        notification: notification.clone(),
    };
    info!(
        "✓ Services initialized ({} alert channel(s))",
        notification.channel_count()
    );

    let utc_offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
        anyhow::anyhow!(
            "UTC offset of {} minutes is out of range",
            config.utc_offset_minutes
        )
    })?;
    let sweep = Arc::new(SweepScheduler::new(SweepJob::new(
        runtime.uow.clone(),
        runtime.clock.clone(),
        notification,
        SweepSettings {
            hour: config.sweep_hour,
            minute: config.sweep_minute,
            utc_offset,
            at_risk_threshold: config.at_risk_alert_threshold,
            step_timeout: TimeoutConfig::global().sweep_step,
        },
    )));
    if config.sweep_enabled {
        sweep.start().await;
    } else {
        info!("Sweep disabled by configuration");
    }

    let facade = EngagementFacade::new(
        services.clone(),
        runtime.clock.clone(),
        config.expose_internal_errors,
    );

    Ok(AppState {
        runtime,
        services,
        facade,
        sweep,
    })
}
