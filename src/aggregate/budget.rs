//! Budget Aggregate
//!
//! Budget is the ledger for one spending category over one period. It tracks
//! a limit and the amount spent against it, and raises a `BudgetExceeded`
//! event the first time spending crosses the limit.
//!
//! Over-budget is a detectable state, not a forbidden one: `spent_amount` may
//! exceed `total_amount`, but `total_amount` may never be set below the
//! current `spent_amount`, and a rollback may never drive `spent_amount`
//! negative.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{AggregateId, BudgetExceeded, DomainError, LedgerEvent};

use super::AggregateRoot;

/// Budget Aggregate
///
/// Mutated exclusively through `apply_transaction`, `rollback_transaction`
/// and `update_total_amount`. Soft-deactivated, never hard-deleted while
/// transactions reference it.
#[derive(Debug, Clone)]
pub struct Budget {
    id: Uuid,
    user_id: Uuid,
    title: String,
    category: String,
    total_amount: Decimal,
    spent_amount: Decimal,
    created_date: DateTime<Utc>,
    is_active: bool,

    /// Events raised by mutations, owned until the persistence layer flushes
    /// them into the outbox
    pending_events: Vec<LedgerEvent>,
}

impl Budget {
    /// Create a new budget for a (user, category, period)
    pub fn create(
        user_id: Uuid,
        title: impl Into<String>,
        total_amount: Decimal,
        category: impl Into<String>,
        created_date: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let title = title.into();

        if total_amount <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(total_amount));
        }
        if title.trim().is_empty() {
            return Err(DomainError::InvalidTitle);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            category: category.into(),
            total_amount,
            spent_amount: Decimal::ZERO,
            created_date,
            is_active: true,
            pending_events: Vec::new(),
        })
    }

    /// Rehydrate a budget from its stored row (no events are raised)
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: Uuid,
        user_id: Uuid,
        title: String,
        category: String,
        total_amount: Decimal,
        spent_amount: Decimal,
        created_date: DateTime<Utc>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            category,
            total_amount,
            spent_amount,
            created_date,
            is_active,
            pending_events: Vec::new(),
        }
    }

    /// Apply a signed transaction delta to the ledger.
    ///
    /// Negative amounts are expenses and increase `spent_amount` by their
    /// magnitude. Positive amounts (inflows, refunds reported as income) do
    /// not count against the budget. Crossing `spent > total` for the first
    /// time raises exactly one `BudgetExceeded` event.
    pub fn apply_transaction(&mut self, amount: Decimal) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::BudgetInactive);
        }

        if amount >= Decimal::ZERO {
            return Ok(());
        }

        let was_exceeded = self.has_exceeded_budget();
        self.spent_amount += amount.abs();

        if !was_exceeded && self.has_exceeded_budget() {
            self.pending_events
                .push(LedgerEvent::BudgetExceeded(BudgetExceeded {
                    budget_id: self.id,
                    user_id: self.user_id,
                    category: self.category.clone(),
                    spent_amount: self.spent_amount,
                    total_amount: self.total_amount,
                    occurred_at: Utc::now(),
                }));
        }

        Ok(())
    }

    /// Reverse a previously applied transaction.
    ///
    /// Decreases `spent_amount` by the transaction's magnitude; fails if the
    /// rollback would drive `spent_amount` negative.
    pub fn rollback_transaction(&mut self, amount: Decimal) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::BudgetInactive);
        }

        let magnitude = amount.abs();
        if magnitude > self.spent_amount {
            return Err(DomainError::RollbackExceedsSpent {
                spent: self.spent_amount,
                rollback: magnitude,
            });
        }

        self.spent_amount -= magnitude;
        Ok(())
    }

    /// Change the budget limit. The new total may not undercut what has
    /// already been spent.
    pub fn update_total_amount(&mut self, new_total: Decimal) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::BudgetInactive);
        }
        if new_total <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(new_total));
        }
        if new_total < self.spent_amount {
            return Err(DomainError::DecreaseBelowSpent {
                new_total,
                spent: self.spent_amount,
            });
        }

        self.total_amount = new_total;
        Ok(())
    }

    /// Pure predicate: is the budget over its limit?
    pub fn has_exceeded_budget(&self) -> bool {
        self.spent_amount > self.total_amount
    }

    /// Soft delete. No event transitions are accepted once inactive.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn spent_amount(&self) -> Decimal {
        self.spent_amount
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

impl AggregateRoot for Budget {
    fn aggregate_id(&self) -> AggregateId {
        AggregateId::Budget(self.id)
    }

    fn pending_events(&self) -> &[LedgerEvent] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.pending_events)
    }
}
