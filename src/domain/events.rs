//! Domain Events
//!
//! Events are immutable facts that have happened in the system. Each event is
//! its own struct so that the outbox payload is exactly the event's fields;
//! the discriminator travels separately in the envelope's `event_type` column
//! rather than inside the JSON.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::AggregateId;

/// A budget's spent amount crossed its total for the first time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetExceeded {
    pub budget_id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub spent_amount: Decimal,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// A bank transaction was persisted locally and is ready to hit the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecorded {
    pub transaction_id: Uuid,
    pub external_id: String,
    pub user_id: Uuid,
    /// Signed amount, outflows negative
    pub amount: Decimal,
    pub name: String,
    /// Primary category, used to locate the matching budget
    pub category: Option<String>,
    pub date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// The closed set of events flowing through the outbox
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    BudgetExceeded(BudgetExceeded),
    TransactionRecorded(TransactionRecorded),
}

impl LedgerEvent {
    /// Get the event type discriminator as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::BudgetExceeded(_) => "BudgetExceeded",
            LedgerEvent::TransactionRecorded(_) => "TransactionRecorded",
        }
    }

    /// Get the aggregate this event relates to
    pub fn aggregate_id(&self) -> AggregateId {
        match self {
            LedgerEvent::BudgetExceeded(e) => AggregateId::Budget(e.budget_id),
            LedgerEvent::TransactionRecorded(e) => {
                AggregateId::BankTransaction(e.transaction_id)
            }
        }
    }

    /// When the event occurred
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::BudgetExceeded(e) => e.occurred_at,
            LedgerEvent::TransactionRecorded(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_type_discriminators() {
        let event = LedgerEvent::BudgetExceeded(BudgetExceeded {
            budget_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: "groceries".to_string(),
            spent_amount: dec!(150),
            total_amount: dec!(100),
            occurred_at: Utc::now(),
        });

        assert_eq!(event.event_type(), "BudgetExceeded");
        assert!(matches!(event.aggregate_id(), AggregateId::Budget(_)));
    }

    #[test]
    fn test_payload_has_no_embedded_tag() {
        let inner = TransactionRecorded {
            transaction_id: Uuid::new_v4(),
            external_id: "ext-1".to_string(),
            user_id: Uuid::new_v4(),
            amount: dec!(-12.50),
            name: "Coffee".to_string(),
            category: Some("dining".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            occurred_at: Utc::now(),
        };

        let json = serde_json::to_value(&inner).unwrap();
        assert!(json.get("type").is_none());
        assert_eq!(json["external_id"], "ext-1");
    }
}
