#![allow(dead_code)]

use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;

use momentum_app::application::catalog_seeder::seed_default_catalog;
use momentum_app::application::services::{
    badge_set, ActivityOutcome, ClaimService, ExperimentService, FreezeService, LedgerService,
    RewardService, StreakService,
};
use momentum_domain::activity::ActivityMetrics;
use momentum_domain::freeze::FreezePolicy;
use momentum_domain::reward::SurprisePolicy;
use momentum_domain::shared::{Clock, UserId};
use momentum_domain::store::UnitOfWork;
use momentum_infrastructure::persistence::{Database, SqliteUnitOfWork};
use momentum_infrastructure::{FixedClock, InMemoryUnitOfWork, ScriptedRandom};

pub const DEFAULT_EXPERIMENT: &str = "streak_rewards_v1";

/// Every engine service wired to one store, a manual clock and scripted randomness
pub struct Engine {
    pub uow: Arc<dyn UnitOfWork>,
    pub clock: Arc<FixedClock>,
    pub rng: Arc<ScriptedRandom>,
    pub streak: StreakService,
    pub freeze: FreezeService,
    pub experiment: ExperimentService,
    pub reward: RewardService,
    pub claim: ClaimService,
    pub ledger: LedgerService,
}

impl Engine {
    /// In-memory store with the bundled catalog. The default experiment is
    /// paused, so every user resolves to "control" without drawing.
    pub async fn start(start: NaiveDate, draws: Vec<f64>) -> Self {
        Self::on_store(
            Arc::new(InMemoryUnitOfWork::new()),
            start,
            draws,
            FreezePolicy::default(),
        )
        .await
    }

    pub async fn with_policy(start: NaiveDate, draws: Vec<f64>, policy: FreezePolicy) -> Self {
        Self::on_store(Arc::new(InMemoryUnitOfWork::new()), start, draws, policy).await
    }

    pub async fn on_store(
        uow: Arc<dyn UnitOfWork>,
        start: NaiveDate,
        draws: Vec<f64>,
        policy: FreezePolicy,
    ) -> Self {
        let clock = Arc::new(FixedClock::at_date(start));
        let rng = Arc::new(ScriptedRandom::new(draws));

        seed_default_catalog(uow.as_ref(), clock.now())
            .await
            .expect("Failed to seed catalog");

        let engine = Self {
            streak: StreakService::new(uow.clone(), clock.clone(), badge_set(Vec::new())),
            freeze: FreezeService::new(uow.clone(), clock.clone(), policy),
            experiment: ExperimentService::new(uow.clone(), clock.clone(), rng.clone()),
            reward: RewardService::new(uow.clone(), clock.clone(), rng.clone(), 5),
            claim: ClaimService::new(
                uow.clone(),
                clock.clone(),
                rng.clone(),
                policy,
                SurprisePolicy::default(),
                5,
            ),
            ledger: LedgerService::new(uow.clone(), clock.clone()),
            uow,
            clock,
            rng,
        };
        engine
            .experiment
            .set_experiment_active(DEFAULT_EXPERIMENT, false)
            .await
            .expect("Failed to pause default experiment");
        engine
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn next_day(&self) {
        self.clock.advance_days(1);
    }

    pub async fn log(&self, user_id: &UserId) -> ActivityOutcome {
        self.streak
            .log_activity(user_id, &metrics())
            .await
            .expect("Failed to log activity")
    }

    /// Log on `days` consecutive days starting today; the clock ends on the last one
    pub async fn practice_days(&self, user_id: &UserId, days: u32) -> ActivityOutcome {
        let mut outcome = self.log(user_id).await;
        for _ in 1..days {
            self.next_day();
            outcome = self.log(user_id).await;
        }
        outcome
    }
}

pub async fn sqlite_store() -> (Database, Arc<dyn UnitOfWork>) {
    let db = Database::in_memory()
        .await
        .expect("Failed to open in-memory database");
    db.run_migrations().await.expect("Failed to run migrations");
    let uow: Arc<dyn UnitOfWork> = Arc::new(SqliteUnitOfWork::new(db.shared_pool()));
    (db, uow)
}

/// File-backed store with a multi-connection pool, so transactions really interleave
pub async fn file_store(path: &Path) -> (Database, Arc<dyn UnitOfWork>) {
    let db = Database::new(path.to_str().expect("utf-8 path"))
        .await
        .expect("Failed to open database file");
    db.run_migrations().await.expect("Failed to run migrations");
    let uow: Arc<dyn UnitOfWork> = Arc::new(SqliteUnitOfWork::new(db.shared_pool()));
    (db, uow)
}

pub fn metrics() -> ActivityMetrics {
    ActivityMetrics {
        practice_seconds: 600,
        characters_typed: 1500,
        words_typed: 300,
        wpm: 42.0,
        accuracy: 93.5,
    }
}

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).expect("valid date")
}

pub fn user(id: &str) -> UserId {
    UserId::parse(id).expect("valid user id")
}
