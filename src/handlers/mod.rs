//! Event Handlers
//!
//! Idempotency-sensitive consumers invoked by the outbox publisher. Delivery
//! is at-least-once, so every handler must tolerate seeing the same logical
//! event more than once.

mod budget_exceeded;
mod notification;
mod transaction_recorded;

pub use budget_exceeded::BudgetExceededHandler;
pub use notification::{LogNotificationSink, Notification, NotificationError, NotificationSink};
pub use transaction_recorded::TransactionRecordedHandler;

use async_trait::async_trait;

use crate::domain::{DomainError, LedgerEvent};
use crate::repository::RepositoryError;

/// Errors a handler can surface to the publisher.
///
/// A returned error leaves the message pending; the publisher redelivers it
/// on a later tick.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// A consumer of published ledger events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name, used in logs
    fn name(&self) -> &'static str;

    /// Whether this handler is interested in the event
    fn handles(&self, event: &LedgerEvent) -> bool;

    /// Apply the handler's side effects.
    ///
    /// Must be safe to repeat: redelivery after a crash or a downstream
    /// failure is expected, not exceptional.
    async fn handle(&self, event: &LedgerEvent) -> Result<(), HandlerError>;
}
