mod claim_service;
mod experiment_service;
mod freeze_service;
mod ledger_service;
mod notification_service;
mod reward_service;
mod streak_service;
mod sweep_scheduler;
mod transaction;

pub(crate) use transaction::finish;

pub use claim_service::ClaimService;
pub use experiment_service::ExperimentService;
pub use freeze_service::{FreezeService, FreezeUsage};
pub use ledger_service::LedgerService;
pub use notification_service::NotificationService;
pub use reward_service::RewardService;
pub use streak_service::{badge_set, ActivityOutcome, StreakService, MAX_HISTORY_DAYS};
pub use sweep_scheduler::{next_run_after, SweepJob, SweepReport, SweepScheduler, SweepSettings};
