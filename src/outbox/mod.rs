//! Outbox module
//!
//! Transactional outbox: events are persisted alongside the state change that
//! produced them, in the same transaction, then published asynchronously.

mod codec;
mod message;
mod publisher;
mod store;

pub use codec::{CodecError, EventRegistry};
pub use message::OutboxMessage;
pub use publisher::{OutboxPublisher, PublisherConfig, TickReport};
pub use store::{OutboxError, OutboxStore, PgOutboxStore};
