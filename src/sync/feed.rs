//! Transaction Feed
//!
//! Contract for the third-party incremental transaction feed: cursor in,
//! added/modified/removed partitions out, cursor out. The provider-specific
//! HTTP client lives outside this crate; everything here is transport-neutral.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One feed pull request
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub access_token: String,
    /// Opaque feed position; `None` requests a full resync
    pub cursor: Option<String>,
    /// Page size
    pub count: i64,
}

/// A transaction item as reported by the feed.
///
/// Amounts follow the provider convention: positive values are outflows.
/// Sign normalization happens at ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedTransaction {
    pub external_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub name: String,
    pub date: NaiveDate,
    pub categories: Vec<String>,
    pub category_id: Option<String>,
    pub merchant_name: Option<String>,
}

/// A removal notice from the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedTransaction {
    pub external_id: String,
}

/// One page of incremental changes
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub added: Vec<FeedTransaction>,
    pub modified: Vec<FeedTransaction>,
    pub removed: Vec<RemovedTransaction>,
    pub next_cursor: String,
    pub has_more: bool,
    /// External item identifier, when the provider reports one
    pub item_id: Option<String>,
}

/// Errors from the external feed
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Request(String),

    #[error("Feed response could not be decoded: {0}")]
    Decode(String),

    #[error("Feed rejected the access token")]
    Unauthorized,

    #[error("No feed provider is configured")]
    NotConfigured,
}

/// The external incremental transaction feed
#[async_trait]
pub trait TransactionFeed: Send + Sync {
    /// Pull one page of changes since `cursor`
    async fn fetch_page(&self, request: &FeedRequest) -> Result<FeedPage, FeedError>;
}

/// Placeholder feed for deployments without a configured provider
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredFeed;

#[async_trait]
impl TransactionFeed for UnconfiguredFeed {
    async fn fetch_page(&self, _request: &FeedRequest) -> Result<FeedPage, FeedError> {
        Err(FeedError::NotConfigured)
    }
}
