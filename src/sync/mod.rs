//! Sync module
//!
//! Cursor-based incremental reconciliation of the external transaction feed.

mod feed;
mod reconciler;

pub use feed::{
    FeedError, FeedPage, FeedRequest, FeedTransaction, RemovedTransaction, TransactionFeed,
    UnconfiguredFeed,
};
pub use reconciler::{PartitionOutcome, SyncError, SyncOutcome, SyncReconciler, SyncRequest};
