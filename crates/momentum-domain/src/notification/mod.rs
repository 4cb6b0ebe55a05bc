use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

/// Message sent to operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub content: String,
    pub level: AlertLevel,
    /// Optional link URL
    pub link: Option<String>,
}

impl NotificationMessage {
    pub fn new(level: AlertLevel, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            level,
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Fire-and-forget channel for operator alerts.
/// Delivery failures are reported but never affect engagement state.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> Result<(), DomainError>;

    /// Channel name used in logs
    fn channel(&self) -> &'static str;
}
