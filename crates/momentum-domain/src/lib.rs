// Domain layer - Pure engagement rules
// No dependencies on infrastructure or presentation layers

pub mod activity;
pub mod analytics;
pub mod badge;
pub mod claim;
pub mod experiment;
pub mod freeze;
pub mod ledger;
pub mod notification;
pub mod reward;
pub mod shared;
pub mod store;
pub mod streak;

// Re-exports for convenience
pub use shared::{DomainError, ErrorCode, UserId};
pub use store::{EngagementTransaction, UnitOfWork};
