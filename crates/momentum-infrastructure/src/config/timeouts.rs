use std::time::Duration;

/// Timeouts for the engine's outbound and storage calls
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// How long SQLite waits on a locked database before reporting busy
    pub db_busy: Duration,

    /// Webhook alert request timeout
    pub webhook_request: Duration,

    /// Upper bound on a single sweep step
    pub sweep_step: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        GLOBAL_TIMEOUT_CONFIG.clone()
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the global timeout configuration
    pub fn global() -> &'static Self {
        &GLOBAL_TIMEOUT_CONFIG
    }
}

static GLOBAL_TIMEOUT_CONFIG: TimeoutConfig = TimeoutConfig {
    db_busy: Duration::from_secs(5),
    webhook_request: Duration::from_secs(10),
    sweep_step: Duration::from_secs(60),
};
