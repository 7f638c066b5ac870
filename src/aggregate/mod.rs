//! Aggregate module
//!
//! Aggregate Root pattern: a consistency boundary whose invariants are
//! enforced by its own methods only. Aggregates are pure in-memory state
//! machines; they raise domain events but never perform I/O.

pub mod budget;

pub use budget::Budget;

use crate::domain::{AggregateId, LedgerEvent};

/// Trait implemented by every aggregate root
pub trait AggregateRoot {
    /// Get the typed aggregate identity
    fn aggregate_id(&self) -> AggregateId;

    /// Events raised since the last flush, in order
    fn pending_events(&self) -> &[LedgerEvent];

    /// Drain the pending-event list.
    ///
    /// Called by the persistence layer once the events have been staged into
    /// the outbox, so repeated saves don't re-emit.
    fn take_events(&mut self) -> Vec<LedgerEvent>;
}
