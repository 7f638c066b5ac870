//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::sync::{FeedError, SyncError};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Pipeline errors
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Repository(#[from] crate::repository::RepositoryError),

    #[error(transparent)]
    Outbox(#[from] crate::outbox::OutboxError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // Domain errors - validation failures are the caller's fault
            AppError::Domain(domain_err) => {
                use crate::domain::DomainError;
                match domain_err {
                    DomainError::InvalidAmount(_) => {
                        (StatusCode::BAD_REQUEST, "invalid_amount", Some(domain_err.to_string()))
                    }
                    DomainError::InvalidTitle => {
                        (StatusCode::BAD_REQUEST, "invalid_title", None)
                    }
                    DomainError::RollbackExceedsSpent { .. } => {
                        (StatusCode::BAD_REQUEST, "rollback_exceeds_spent", Some(domain_err.to_string()))
                    }
                    DomainError::DecreaseBelowSpent { .. } => {
                        (StatusCode::BAD_REQUEST, "decrease_below_spent", Some(domain_err.to_string()))
                    }
                    DomainError::BudgetInactive => {
                        (StatusCode::BAD_REQUEST, "budget_inactive", None)
                    }
                    DomainError::BudgetNotFound(id) => {
                        (StatusCode::NOT_FOUND, "budget_not_found", Some(id.clone()))
                    }
                }
            }

            // Feed problems surface as gateway errors on the sync trigger
            AppError::Sync(SyncError::Feed(feed_err)) => match feed_err {
                FeedError::NotConfigured => {
                    (StatusCode::SERVICE_UNAVAILABLE, "feed_not_configured", None)
                }
                FeedError::Unauthorized => {
                    (StatusCode::BAD_GATEWAY, "feed_unauthorized", None)
                }
                _ => (StatusCode::BAD_GATEWAY, "feed_error", Some(feed_err.to_string())),
            },

            // 500 Internal Server Error
            AppError::Sync(e) => {
                tracing::error!("Sync error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "sync_error", None)
            }
            AppError::Repository(e) => {
                tracing::error!("Repository error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "repository_error", None)
            }
            AppError::Outbox(e) => {
                tracing::error!("Outbox error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "outbox_error", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validation_errors_map_to_400() {
        let response =
            AppError::Domain(DomainError::InvalidAmount(dec!(-1))).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Domain(DomainError::RollbackExceedsSpent {
            spent: dec!(10),
            rollback: dec!(20),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unconfigured_feed_maps_to_503() {
        let response = AppError::Sync(SyncError::Feed(FeedError::NotConfigured)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
