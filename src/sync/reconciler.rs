//! Sync Reconciler
//!
//! Pulls the next page of the external transaction feed and merges it into
//! local state without duplication. The three partitions (added, modified,
//! removed) are applied in their own transactions with isolated failure
//! handling, and the stored cursor only advances after a fully clean run, so
//! a retry replays the same page. Partition application is idempotent
//! (insert-if-absent, update-by-id, mark-removed-by-id), which makes that
//! replay safe.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::repository::{
    BankTransaction, BankTransactionRepository, RepositoryError, SyncCursorRepository,
};

use super::feed::{FeedError, FeedPage, FeedRequest, FeedTransaction, TransactionFeed};

/// Default page size requested from the feed
const DEFAULT_PAGE_SIZE: i64 = 100;

/// One sync invocation
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub user_id: Uuid,
    pub access_token: String,
    /// Explicit feed position; `None` resolves the stored cursor
    pub cursor: Option<String>,
    pub count: Option<i64>,
}

/// Errors that abort a sync run outright (partition failures do not)
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// How one partition fared
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionOutcome {
    /// Records the feed reported for this partition
    pub attempted: usize,
    /// Records actually written locally
    pub applied: usize,
    /// Present when the partition's transaction failed
    pub error: Option<String>,
}

impl PartitionOutcome {
    fn from_result(attempted: usize, result: Result<usize, RepositoryError>) -> Self {
        match result {
            Ok(applied) => Self {
                attempted,
                applied,
                error: None,
            },
            Err(e) => Self {
                attempted,
                applied: 0,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of one sync page, mirroring the raw feed response
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub item_id: Option<String>,
    pub next_cursor: String,
    pub has_more: bool,
    pub cursor_advanced: bool,
    pub added: PartitionOutcome,
    pub modified: PartitionOutcome,
    pub removed: PartitionOutcome,
}

impl SyncOutcome {
    /// Short status written to the cursor row
    pub fn status(&self) -> String {
        let mut failures: Vec<&str> = Vec::new();
        if self.added.failed() {
            failures.push("added");
        }
        if self.modified.failed() {
            failures.push("modified");
        }
        if self.removed.failed() {
            failures.push("removed");
        }

        if failures.is_empty() {
            "ok".to_string()
        } else {
            format!("partial: {}", failures.join(","))
        }
    }

    pub fn fully_applied(&self) -> bool {
        !self.added.failed() && !self.modified.failed() && !self.removed.failed()
    }
}

/// Sync Reconciler
pub struct SyncReconciler {
    feed: Arc<dyn TransactionFeed>,
    transactions: Arc<dyn BankTransactionRepository>,
    cursors: Arc<dyn SyncCursorRepository>,
    default_page_size: i64,
}

impl SyncReconciler {
    pub fn new(
        feed: Arc<dyn TransactionFeed>,
        transactions: Arc<dyn BankTransactionRepository>,
        cursors: Arc<dyn SyncCursorRepository>,
    ) -> Self {
        Self {
            feed,
            transactions,
            cursors,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Pull and apply one page of the feed.
    ///
    /// The caller observes `has_more` on the outcome and keeps paging.
    pub async fn run_sync_page(&self, request: SyncRequest) -> Result<SyncOutcome, SyncError> {
        let mut item_id: Option<String> = None;

        // Resolve the effective cursor. A failed lookup is non-fatal and
        // falls back to a full resync.
        let cursor = match request.cursor.clone() {
            Some(cursor) => Some(cursor),
            None => match self
                .cursors
                .get_last_cursor(request.user_id, &request.access_token)
                .await
            {
                Ok(Some(stored)) => {
                    item_id = Some(stored.item_id);
                    Some(stored.cursor)
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(
                        user_id = %request.user_id,
                        error = %e,
                        "Cursor lookup failed, falling back to full resync"
                    );
                    None
                }
            },
        };

        let page = self
            .feed
            .fetch_page(&FeedRequest {
                access_token: request.access_token.clone(),
                cursor,
                count: request.count.unwrap_or(self.default_page_size),
            })
            .await?;

        if page.item_id.is_some() {
            item_id = page.item_id.clone();
        }

        // Each partition runs in its own transaction; a failure in one must
        // not prevent the others from being attempted.
        let added = self.apply_added(request.user_id, &page.added).await;
        let modified = self.apply_modified(request.user_id, &page.modified).await;
        let removed = self.apply_removed(&page).await;

        // Bookkeeping only: a failed item-id refresh never fails the sync.
        if let Some(item) = item_id.as_deref() {
            if let Err(e) = self
                .cursors
                .update_item_link(request.user_id, &request.access_token, item)
                .await
            {
                tracing::warn!(
                    user_id = %request.user_id,
                    error = %e,
                    "Item link bookkeeping update failed"
                );
            }
        }

        let outcome = SyncOutcome {
            item_id: item_id.clone(),
            next_cursor: page.next_cursor.clone(),
            has_more: page.has_more,
            cursor_advanced: false,
            added,
            modified,
            removed,
        };

        // Advancing the cursor is the last write. A partition failure leaves
        // the cursor in place so the same page is retried wholesale.
        if outcome.fully_applied() && !page.next_cursor.is_empty() {
            self.cursors
                .save_cursor(
                    request.user_id,
                    &request.access_token,
                    item_id.as_deref().unwrap_or(""),
                    &page.next_cursor,
                    &outcome.status(),
                )
                .await?;

            return Ok(SyncOutcome {
                cursor_advanced: true,
                ..outcome
            });
        }

        if !outcome.fully_applied() {
            tracing::warn!(
                user_id = %request.user_id,
                status = %outcome.status(),
                "Sync page partially failed; cursor not advanced"
            );
        }

        Ok(outcome)
    }

    /// Insert net-new records: dedup within the batch by external id, filter
    /// out ids already present, bulk-insert the remainder all-or-nothing.
    async fn apply_added(&self, user_id: Uuid, added: &[FeedTransaction]) -> PartitionOutcome {
        let result = self.insert_net_new(user_id, added).await;
        if let Err(ref e) = result {
            tracing::error!(user_id = %user_id, error = %e, "Added partition failed");
        }
        PartitionOutcome::from_result(added.len(), result)
    }

    async fn insert_net_new(
        &self,
        user_id: Uuid,
        items: &[FeedTransaction],
    ) -> Result<usize, RepositoryError> {
        if items.is_empty() {
            return Ok(0);
        }

        // Keep the first occurrence of each external id within the page
        let mut seen: HashSet<&str> = HashSet::new();
        let unique: Vec<&FeedTransaction> = items
            .iter()
            .filter(|t| seen.insert(t.external_id.as_str()))
            .collect();

        let ids: Vec<String> = unique.iter().map(|t| t.external_id.clone()).collect();
        let existing = self.transactions.existing_external_ids(&ids).await?;

        let net_new: Vec<BankTransaction> = unique
            .into_iter()
            .filter(|t| !existing.contains(&t.external_id))
            .map(|t| Self::from_feed(user_id, t))
            .collect();

        if net_new.is_empty() {
            return Ok(0);
        }

        self.transactions.add_range(&net_new).await?;
        Ok(net_new.len())
    }

    /// Update records in place; a record the feed modified but we never saw
    /// as added (prior partial failure) is inserted via the added path.
    async fn apply_modified(
        &self,
        user_id: Uuid,
        modified: &[FeedTransaction],
    ) -> PartitionOutcome {
        let result = self.upsert_modified(user_id, modified).await;
        if let Err(ref e) = result {
            tracing::error!(user_id = %user_id, error = %e, "Modified partition failed");
        }
        PartitionOutcome::from_result(modified.len(), result)
    }

    async fn upsert_modified(
        &self,
        user_id: Uuid,
        modified: &[FeedTransaction],
    ) -> Result<usize, RepositoryError> {
        if modified.is_empty() {
            return Ok(0);
        }

        let mut updates: Vec<BankTransaction> = Vec::new();
        let mut missing: Vec<FeedTransaction> = Vec::new();

        for item in modified {
            match self
                .transactions
                .get_by_external_id(&item.external_id)
                .await?
            {
                Some(mut record) => {
                    record.amount = Self::normalize_amount(item.amount);
                    record.name = item.name.clone();
                    record.date = item.date;
                    record.categories = item.categories.clone();
                    record.merchant_name = item.merchant_name.clone();
                    updates.push(record);
                }
                None => missing.push(item.clone()),
            }
        }

        let mut applied = 0;

        if !updates.is_empty() {
            self.transactions.update_range(&updates).await?;
            applied += updates.len();
        }

        applied += self.insert_net_new(user_id, &missing).await?;

        Ok(applied)
    }

    /// Soft-delete removed records, preserving historical ledger correctness
    async fn apply_removed(&self, page: &FeedPage) -> PartitionOutcome {
        let ids: Vec<String> = page
            .removed
            .iter()
            .map(|r| r.external_id.clone())
            .collect();

        if ids.is_empty() {
            return PartitionOutcome::default();
        }

        let result = self
            .transactions
            .mark_removed(&ids)
            .await
            .map(|rows| rows as usize);
        if let Err(ref e) = result {
            tracing::error!(error = %e, "Removed partition failed");
        }
        PartitionOutcome::from_result(ids.len(), result)
    }

    /// Normalize feed amounts so outflows are negative locally
    fn normalize_amount(feed_amount: rust_decimal::Decimal) -> rust_decimal::Decimal {
        -feed_amount
    }

    fn from_feed(user_id: Uuid, item: &FeedTransaction) -> BankTransaction {
        BankTransaction {
            id: Uuid::new_v4(),
            external_id: item.external_id.clone(),
            account_id: item.account_id.clone(),
            user_id,
            amount: Self::normalize_amount(item.amount),
            name: item.name.clone(),
            date: item.date,
            categories: item.categories.clone(),
            merchant_name: item.merchant_name.clone(),
            is_removed: false,
        }
    }
}
