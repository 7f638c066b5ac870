//! Outbox Publisher
//!
//! Periodic single-flight worker that drains pending outbox messages and
//! dispatches them to in-process handlers. Delivery is at-least-once: a crash
//! after dispatch but before the processed mark means the same message is
//! redelivered next tick, so handlers must be safe to repeat.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::handlers::EventHandler;

use super::codec::EventRegistry;
use super::store::{OutboxError, OutboxStore};

/// Publisher tuning knobs
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Maximum messages fetched per tick (default: 10)
    pub batch_size: i64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Messages fetched from the store
    pub fetched: usize,
    /// Messages dispatched to every interested handler and marked processed
    pub dispatched: usize,
    /// Messages whose payload failed to decode, left pending
    pub poisoned: usize,
    /// Messages a handler failed on, left pending for redelivery
    pub failed: usize,
}

/// Outbox Publisher
pub struct OutboxPublisher {
    store: Arc<dyn OutboxStore>,
    registry: EventRegistry,
    handlers: Vec<Arc<dyn EventHandler>>,
    config: PublisherConfig,
    /// Serializes ticks: overlapping runs would double-dispatch a batch
    tick_guard: tokio::sync::Mutex<()>,
}

impl OutboxPublisher {
    pub fn new(store: Arc<dyn OutboxStore>, handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self::with_config(store, handlers, PublisherConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn OutboxStore>,
        handlers: Vec<Arc<dyn EventHandler>>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            store,
            registry: EventRegistry::default(),
            handlers,
            config,
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Drain one batch of pending messages.
    ///
    /// Single-flight: a concurrent call waits for the running tick to finish
    /// before starting its own. Messages are dispatched in `created_at` order;
    /// all processed marks for the batch land in one transaction at the end.
    pub async fn tick(&self) -> Result<TickReport, OutboxError> {
        let _flight = self.tick_guard.lock().await;

        let batch = self.store.fetch_pending(self.config.batch_size).await?;

        let mut report = TickReport {
            fetched: batch.len(),
            ..TickReport::default()
        };
        let mut processed_ids: Vec<Uuid> = Vec::with_capacity(batch.len());

        for message in batch {
            let event = match self.registry.decode(&message.event_type, message.payload) {
                Ok(event) => event,
                Err(e) => {
                    // Poison message: left pending, never marked, never retried
                    // by us. Loud on purpose since there is no dead-letter path.
                    tracing::warn!(
                        message_id = %message.id,
                        event_type = %message.event_type,
                        error = %e,
                        "Skipping undecodable outbox message"
                    );
                    report.poisoned += 1;
                    continue;
                }
            };

            let mut delivered = true;
            for handler in self.handlers.iter().filter(|h| h.handles(&event)) {
                if let Err(e) = handler.handle(&event).await {
                    tracing::error!(
                        message_id = %message.id,
                        handler = handler.name(),
                        error = %e,
                        "Handler failed; message stays pending for redelivery"
                    );
                    delivered = false;
                    break;
                }
            }

            if delivered {
                processed_ids.push(message.id);
                report.dispatched += 1;
            } else {
                report.failed += 1;
            }
        }

        if !processed_ids.is_empty() {
            self.store
                .mark_processed(&processed_ids, Utc::now())
                .await?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_config_default() {
        let config = PublisherConfig::default();
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn test_tick_report_default() {
        let report = TickReport::default();
        assert_eq!(report.fetched, 0);
        assert_eq!(report.dispatched, 0);
    }
}
