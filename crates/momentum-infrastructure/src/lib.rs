// Infrastructure layer - Technical implementations
// Depends on domain layer, implements its interfaces

pub mod clock;
pub mod config;
pub mod logging;
pub mod memory;
pub mod notification;
pub mod persistence;
pub mod random;

pub use clock::{FixedClock, SystemClock};
pub use config::EngagementConfig;
pub use memory::InMemoryUnitOfWork;
pub use persistence::{Database, SqliteUnitOfWork};
pub use random::{ScriptedRandom, SeededRandom, ThreadRandom};
