//! Event Codec
//!
//! Explicit registry mapping an `event_type` discriminator to a decoder
//! function. This replaces ambient polymorphic serialization: a payload that
//! does not match a known event type surfaces as a typed error, which the
//! publisher treats as a poison message.

use std::collections::HashMap;

use crate::domain::LedgerEvent;

/// Errors that can occur decoding an outbox payload
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No decoder registered for this discriminator
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The payload does not match the registered event's shape
    #[error("Payload decode error for {event_type}: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

type DecodeFn = fn(serde_json::Value) -> Result<LedgerEvent, serde_json::Error>;

/// Registry of event decoders keyed by discriminator
pub struct EventRegistry {
    decoders: HashMap<&'static str, DecodeFn>,
}

impl EventRegistry {
    /// Empty registry; prefer `EventRegistry::default` for the known set
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register a decoder for an event type
    pub fn register(&mut self, event_type: &'static str, decode: DecodeFn) {
        self.decoders.insert(event_type, decode);
    }

    /// Decode a payload by its discriminator
    pub fn decode(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<LedgerEvent, CodecError> {
        let decode = self
            .decoders
            .get(event_type)
            .ok_or_else(|| CodecError::UnknownEventType(event_type.to_string()))?;

        decode(payload).map_err(|source| CodecError::Payload {
            event_type: event_type.to_string(),
            source,
        })
    }

    /// Check whether a discriminator is known
    pub fn knows(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }
}

impl Default for EventRegistry {
    /// Registry covering the full closed set of ledger events
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("BudgetExceeded", |payload| {
            Ok(LedgerEvent::BudgetExceeded(serde_json::from_value(payload)?))
        });
        registry.register("TransactionRecorded", |payload| {
            Ok(LedgerEvent::TransactionRecorded(serde_json::from_value(
                payload,
            )?))
        });
        registry
    }
}
