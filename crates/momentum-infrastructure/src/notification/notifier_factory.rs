use std::sync::Arc;

use super::{LogNotifier, WebhookNotifier};
use crate::config::EngagementConfig;
use momentum_domain::notification::AdminNotifier;
use momentum_domain::shared::DomainError;

/// Webhook when configured, otherwise the log channel
pub fn create_notifier(config: &EngagementConfig) -> Result<Arc<dyn AdminNotifier>, DomainError> {
    match &config.alert_webhook_url {
        Some(url) => {
            log::info!("[notify] Sending operator alerts to webhook {}", url.host_str().unwrap_or("?"));
            Ok(Arc::new(WebhookNotifier::new(url.clone())?))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_factory_picks_channel() {
        let config = EngagementConfig::default();
        assert_eq!(create_notifier(&config).unwrap().channel(), "log");

        let config = config
            .with_alert_webhook_url(Some(Url::parse("https://hooks.example.com/x").unwrap()));
        assert_eq!(create_notifier(&config).unwrap().channel(), "webhook");
    }
}
