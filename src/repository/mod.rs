//! Repository module
//!
//! Collaborator interfaces over the relational datastore, plus their Postgres
//! implementations. All mutual exclusion is pushed to the storage transaction
//! boundary; no in-process locks guard these tables.

mod budget;
mod cursor;
mod transactions;

pub use budget::{BudgetRepository, PgBudgetRepository};
pub use cursor::{PgSyncCursorRepository, SyncCursor, SyncCursorRepository};
pub use transactions::{BankTransaction, BankTransactionRepository, PgBankTransactionRepository};

/// Errors from repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Used by non-database implementations
    #[error("Storage error: {0}")]
    Storage(String),
}
