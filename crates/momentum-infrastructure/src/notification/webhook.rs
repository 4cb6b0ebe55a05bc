use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

use crate::config::TimeoutConfig;
use momentum_domain::notification::{AdminNotifier, NotificationMessage};
use momentum_domain::shared::DomainError;

/// Posts alerts as JSON to an operator webhook
pub struct WebhookNotifier {
    url: Url,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: Url) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(TimeoutConfig::global().webhook_request)
            .build()
            .map_err(|e| {
                DomainError::Infrastructure(format!("Failed to build webhook client: {}", e))
            })?;
        Ok(Self { url, client })
    }

    fn build_payload(message: &NotificationMessage) -> serde_json::Value {
        json!({
            "title": message.title,
            "content": message.content,
            "level": message.level,
            "link": message.link,
        })
    }
}

#[async_trait]
impl AdminNotifier for WebhookNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), DomainError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&Self::build_payload(message))
            .send()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Infrastructure(format!(
                "Webhook returned {}: {}",
                status, body
            )));
        }

        log::debug!("[notify] Webhook alert '{}' delivered", message.title);
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "webhook"
    }
}
