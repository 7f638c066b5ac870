//! budgetLedger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregate;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod outbox;
pub mod repository;
pub mod sync;

// Modules used primarily by the binary
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{AggregateId, DomainError, EventEnvelope, LedgerEvent};
