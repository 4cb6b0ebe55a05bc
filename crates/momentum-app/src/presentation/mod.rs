pub mod bootstrap;
pub mod error;
pub mod facade;
pub mod state;

pub use error::CommandError;
pub use facade::EngagementFacade;
pub use state::{AppState, Runtime, Services};
