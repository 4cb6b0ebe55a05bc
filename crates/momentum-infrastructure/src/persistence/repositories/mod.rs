// Repository ports implemented on `SqliteTransactionContext`
mod activity_repo;
mod analytics_repo;
mod claim_repo;
mod experiment_repo;
mod freeze_repo;
mod ledger_repo;
mod reward_repo;
mod streak_repo;
