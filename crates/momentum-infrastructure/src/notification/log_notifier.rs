use async_trait::async_trait;

use momentum_domain::notification::{AdminNotifier, AlertLevel, NotificationMessage};
use momentum_domain::shared::DomainError;

/// Writes alerts to the application log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), DomainError> {
        match message.level {
            AlertLevel::Info => tracing::info!(
                target: "momentum::alerts",
                title = %message.title,
                "{}",
                message.content
            ),
            AlertLevel::Warning => tracing::warn!(
                target: "momentum::alerts",
                title = %message.title,
                "{}",
                message.content
            ),
            AlertLevel::Critical => tracing::error!(
                target: "momentum::alerts",
                title = %message.title,
                "{}",
                message.content
            ),
        }
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}
