//! Transaction Recorded Handler
//!
//! Applies a newly recorded bank transaction to the matching budget ledger
//! and notifies the owner.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{LedgerEvent, TransactionRecorded};
use crate::repository::BudgetRepository;

use super::{EventHandler, HandlerError, Notification, NotificationSink};

/// Handler for `TransactionRecorded` events.
///
/// Locates the active budget for (user, category, month of the transaction
/// date), applies the signed amount, persists the ledger, then pushes a live
/// notification. The ledger write is the handler's contract; the notification
/// is best-effort. On redelivery the amount is applied again, matching the
/// reference behavior documented in DESIGN.md.
pub struct TransactionRecordedHandler {
    budgets: Arc<dyn BudgetRepository>,
    notifier: Arc<dyn NotificationSink>,
}

impl TransactionRecordedHandler {
    pub fn new(budgets: Arc<dyn BudgetRepository>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { budgets, notifier }
    }

    async fn apply(&self, event: &TransactionRecorded) -> Result<(), HandlerError> {
        let Some(category) = event.category.as_deref() else {
            tracing::debug!(
                external_id = %event.external_id,
                "Transaction has no category, nothing to apply"
            );
            return Ok(());
        };

        let Some(mut budget) = self
            .budgets
            .get_by_category(category, event.user_id, event.date)
            .await?
        else {
            tracing::debug!(
                category = category,
                user_id = %event.user_id,
                "No active budget for transaction, nothing to apply"
            );
            return Ok(());
        };

        budget.apply_transaction(event.amount)?;
        // Captures any BudgetExceeded follow-up event into the outbox
        self.budgets.update(&mut budget).await?;

        let notification = Notification::new(
            "New transaction",
            format!(
                "{} ({}) applied to budget {}",
                event.name,
                event.amount,
                budget.title()
            ),
        );

        // Ledger update already committed; a failed push must not roll it
        // back or block redelivery of other messages.
        if let Err(e) = self.notifier.push(event.user_id, notification).await {
            tracing::warn!(
                user_id = %event.user_id,
                error = %e,
                "Notification push failed after ledger update; not retrying"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for TransactionRecordedHandler {
    fn name(&self) -> &'static str {
        "transaction_recorded"
    }

    fn handles(&self, event: &LedgerEvent) -> bool {
        matches!(event, LedgerEvent::TransactionRecorded(_))
    }

    async fn handle(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        match event {
            LedgerEvent::TransactionRecorded(e) => self.apply(e).await,
            _ => Ok(()),
        }
    }
}
