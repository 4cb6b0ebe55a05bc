// Application and presentation layers of the engagement engine.
// The transport layer talks to `presentation::EngagementFacade` only.

pub mod application;
pub mod presentation;

pub use presentation::{AppState, CommandError, EngagementFacade};
