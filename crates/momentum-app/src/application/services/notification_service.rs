use std::sync::Arc;
use tracing::{error, info};

use momentum_domain::notification::{AdminNotifier, NotificationMessage};

/// Fans operator alerts out to every configured channel.
/// A failing channel is logged and never reaches the caller.
pub struct NotificationService {
    notifiers: Vec<Arc<dyn AdminNotifier>>,
}

impl NotificationService {
    pub fn new(notifiers: Vec<Arc<dyn AdminNotifier>>) -> Self {
        Self { notifiers }
    }

    pub fn channel_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Returns how many channels accepted the message
    pub async fn send_to_all(&self, message: &NotificationMessage) -> usize {
        if self.notifiers.is_empty() {
            info!("[notify] No alert channels configured, skipping '{}'", message.title);
            return 0;
        }

        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.send(message).await {
                Ok(()) => {
                    delivered += 1;
                    info!("[notify] Sent '{}' via {}", message.title, notifier.channel());
                }
                Err(e) => {
                    error!(
                        "[notify] Failed to send '{}' via {}: {}",
                        message.title,
                        notifier.channel(),
                        e
                    );
                }
            }
        }
        delivered
    }
}
