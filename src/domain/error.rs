//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

/// Domain-specific errors
///
/// These errors represent budget invariant violations. They are raised
/// synchronously from the aggregate, never retried, and independent of the
/// web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Budget total must be strictly positive
    #[error("Invalid amount: total must be positive (got {0})")]
    InvalidAmount(Decimal),

    /// Budget title must be non-empty
    #[error("Invalid title: title must not be empty")]
    InvalidTitle,

    /// Rolling back more than was spent would drive spent below zero
    #[error("Rollback exceeds spent: spent {spent}, rollback {rollback}")]
    RollbackExceedsSpent { spent: Decimal, rollback: Decimal },

    /// Total amount may never be set below the current spent amount
    #[error("Cannot decrease total below spent: new total {new_total}, spent {spent}")]
    DecreaseBelowSpent { new_total: Decimal, spent: Decimal },

    /// Deactivated budgets accept no further transitions
    #[error("Budget is inactive")]
    BudgetInactive,

    /// Budget not found
    #[error("Budget not found: {0}")]
    BudgetNotFound(String),
}

impl DomainError {
    /// Check if this is a client error (caller's fault, maps to 4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidTitle
                | Self::RollbackExceedsSpent { .. }
                | Self::DecreaseBelowSpent { .. }
                | Self::BudgetInactive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rollback_exceeds_spent_error() {
        let err = DomainError::RollbackExceedsSpent {
            spent: dec!(100),
            rollback: dec!(150),
        };

        assert!(err.is_client_error());
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn test_decrease_below_spent_error() {
        let err = DomainError::DecreaseBelowSpent {
            new_total: dec!(50),
            spent: dec!(80),
        };

        assert!(err.is_client_error());
    }

    #[test]
    fn test_not_found_is_not_client_error() {
        let err = DomainError::BudgetNotFound("abc".to_string());
        assert!(!err.is_client_error());
    }
}
