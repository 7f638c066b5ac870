//! Domain module
//!
//! Core domain types and business logic.

pub mod envelope;
pub mod error;
pub mod events;

pub use envelope::{AggregateId, EventEnvelope};
pub use error::DomainError;
pub use events::{BudgetExceeded, LedgerEvent, TransactionRecorded};
