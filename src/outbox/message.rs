//! Outbox Message
//!
//! Persisted projection of an event envelope. Rows are created in the same
//! transaction as the aggregate state change that produced them, mutated only
//! by the publisher, and never deleted (the table doubles as an audit log).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::EventEnvelope;

/// One row of the `outbox_messages` table
#[derive(Debug, Clone)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Set once by the publisher, never cleared
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Build a fresh pending message from an envelope
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id: envelope.aggregate_id.raw(),
            event_type: envelope.event_type.clone(),
            payload: envelope.payload.clone(),
            created_at: envelope.occurred_at,
            processed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.processed_at.is_none()
    }
}
