//! Budget Exceeded Handler
//!
//! Pushes an over-budget warning to the owner's session.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::LedgerEvent;

use super::{EventHandler, HandlerError, Notification, NotificationSink};

/// Handler for `BudgetExceeded` events.
///
/// The push is this handler's whole job, so a failed push propagates and the
/// message is redelivered. Pushing the same warning twice is harmless.
pub struct BudgetExceededHandler {
    notifier: Arc<dyn NotificationSink>,
}

impl BudgetExceededHandler {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventHandler for BudgetExceededHandler {
    fn name(&self) -> &'static str {
        "budget_exceeded"
    }

    fn handles(&self, event: &LedgerEvent) -> bool {
        matches!(event, LedgerEvent::BudgetExceeded(_))
    }

    async fn handle(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        let LedgerEvent::BudgetExceeded(e) = event else {
            return Ok(());
        };

        let notification = Notification::new(
            "Budget exceeded",
            format!(
                "Budget for {} is over its limit: spent {} of {}",
                e.category, e.spent_amount, e.total_amount
            ),
        );

        self.notifier.push(e.user_id, notification).await?;

        Ok(())
    }
}
