//! Notification Sink
//!
//! Push-to-user-session collaborator invoked by event handlers. The real
//! delivery channel (websocket hub, mobile push) lives outside this crate;
//! the default sink writes structured log lines.

use async_trait::async_trait;
use uuid::Uuid;

/// A message destined for a user's live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Errors pushing a notification
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification push failed: {0}")]
    Push(String),
}

/// Sink for live user notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn push(&self, user_id: Uuid, notification: Notification)
        -> Result<(), NotificationError>;
}

/// Sink that logs instead of delivering, for deployments without a push hub
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn push(
        &self,
        user_id: Uuid,
        notification: Notification,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            user_id = %user_id,
            title = %notification.title,
            body = %notification.body,
            "User notification"
        );
        Ok(())
    }
}
