//! Event Envelope
//!
//! The typed record of "something happened to aggregate X", owned by the
//! aggregate until the persistence layer flushes it into the outbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::LedgerEvent;

/// Identity of the aggregate an event belongs to.
///
/// A closed set of id variants, each resolved to its raw identifier by a
/// `match` at compile time. Adding an aggregate kind means adding a variant
/// here, so an unknown id type cannot reach the outbox at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateId {
    Budget(Uuid),
    BankTransaction(Uuid),
}

impl AggregateId {
    /// Resolve the raw identifier for storage
    pub fn raw(&self) -> Uuid {
        match self {
            AggregateId::Budget(id) => *id,
            AggregateId::BankTransaction(id) => *id,
        }
    }
}

/// Serialized record of a domain event, ready to become an outbox row
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub aggregate_id: AggregateId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Wrap a typed event, tagging it with its discriminator
    pub fn from_event(event: &LedgerEvent) -> Result<Self, serde_json::Error> {
        let payload = match event {
            LedgerEvent::BudgetExceeded(e) => serde_json::to_value(e)?,
            LedgerEvent::TransactionRecorded(e) => serde_json::to_value(e)?,
        };

        Ok(Self {
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            payload,
            occurred_at: event.occurred_at(),
        })
    }
}
