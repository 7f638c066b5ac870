//! Common test utilities
//!
//! In-memory implementations of every collaborator trait, so the pipeline
//! logic is exercised without a database.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use budget_ledger::aggregate::{AggregateRoot, Budget};
use budget_ledger::domain::EventEnvelope;
use budget_ledger::handlers::{Notification, NotificationError, NotificationSink};
use budget_ledger::outbox::{OutboxError, OutboxMessage, OutboxStore};
use budget_ledger::repository::{
    BankTransaction, BankTransactionRepository, BudgetRepository, RepositoryError, SyncCursor,
    SyncCursorRepository,
};
use budget_ledger::sync::{FeedError, FeedPage, FeedRequest, TransactionFeed};

// =========================================================================
// Outbox store
// =========================================================================

#[derive(Default)]
pub struct MemoryOutboxStore {
    messages: Mutex<Vec<OutboxMessage>>,
    /// When set, the next mark_processed call fails (simulates a crash
    /// between dispatch and the processed mark)
    pub fail_mark: AtomicBool,
}

impl MemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an envelope as a pending message, returning its id
    pub fn push(&self, envelope: &EventEnvelope) -> Uuid {
        let message = OutboxMessage::from_envelope(envelope);
        let id = message.id;
        self.messages.lock().unwrap().push(message);
        id
    }

    /// Stage a raw message, bypassing the codec (for poison scenarios)
    pub fn push_raw(
        &self,
        event_type: &str,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let message = OutboxMessage {
            id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            payload,
            created_at,
            processed_at: None,
        };
        let id = message.id;
        self.messages.lock().unwrap().push(message);
        id
    }

    pub fn is_processed(&self, id: Uuid) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.id == id && m.processed_at.is_some())
    }

    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_pending())
            .map(|m| m.id)
            .collect()
    }
}

#[async_trait]
impl OutboxStore for MemoryOutboxStore {
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxMessage>, OutboxError> {
        let mut pending: Vec<OutboxMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_processed(
        &self,
        ids: &[Uuid],
        processed_at: DateTime<Utc>,
    ) -> Result<(), OutboxError> {
        if self.fail_mark.swap(false, Ordering::SeqCst) {
            return Err(OutboxError::Storage(
                "mark_processed lost before commit".to_string(),
            ));
        }

        let mut messages = self.messages.lock().unwrap();
        for message in messages.iter_mut() {
            if ids.contains(&message.id) && message.processed_at.is_none() {
                message.processed_at = Some(processed_at);
            }
        }
        Ok(())
    }
}

// =========================================================================
// Budget repository
// =========================================================================

#[derive(Default)]
pub struct MemoryBudgetRepository {
    budgets: Mutex<Vec<Budget>>,
    /// Envelopes that would have landed in the outbox on save
    pub staged: Mutex<Vec<EventEnvelope>>,
    pub update_count: AtomicUsize,
}

impl MemoryBudgetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, budget: Budget) {
        self.budgets.lock().unwrap().push(budget);
    }

    pub fn spent_of(&self, budget_id: Uuid) -> Option<rust_decimal::Decimal> {
        self.budgets
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id() == budget_id)
            .map(|b| b.spent_amount())
    }

    pub fn staged_event_types(&self) -> Vec<String> {
        self.staged
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl BudgetRepository for MemoryBudgetRepository {
    async fn get_by_category(
        &self,
        category: &str,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Budget>, RepositoryError> {
        Ok(self
            .budgets
            .lock()
            .unwrap()
            .iter()
            .find(|b| {
                let created = b.created_date().date_naive();
                b.category() == category
                    && b.user_id() == user_id
                    && b.is_active()
                    && created.year() == date.year()
                    && created.month() == date.month()
            })
            .cloned())
    }

    async fn update(&self, budget: &mut Budget) -> Result<(), RepositoryError> {
        let envelopes: Vec<EventEnvelope> = budget
            .take_events()
            .iter()
            .map(EventEnvelope::from_event)
            .collect::<Result<_, _>>()?;
        self.staged.lock().unwrap().extend(envelopes);

        let mut budgets = self.budgets.lock().unwrap();
        if let Some(existing) = budgets.iter_mut().find(|b| b.id() == budget.id()) {
            *existing = budget.clone();
        }
        self.update_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =========================================================================
// Bank transaction repository
// =========================================================================

#[derive(Default)]
pub struct MemoryBankTransactionRepository {
    rows: Mutex<Vec<BankTransaction>>,
    /// Envelopes staged alongside inserts, mirroring the Postgres impl
    pub staged: Mutex<Vec<EventEnvelope>>,
    pub fail_add: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl MemoryBankTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: BankTransaction) {
        self.rows.lock().unwrap().push(record);
    }

    pub fn all(&self) -> Vec<BankTransaction> {
        self.rows.lock().unwrap().clone()
    }

    pub fn by_external_id(&self, external_id: &str) -> Option<BankTransaction> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.external_id == external_id)
            .cloned()
    }
}

#[async_trait]
impl BankTransactionRepository for MemoryBankTransactionRepository {
    async fn existing_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashSet<String>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(external_ids
            .iter()
            .filter(|id| rows.iter().any(|r| &r.external_id == *id))
            .cloned()
            .collect())
    }

    async fn add_range(&self, records: &[BankTransaction]) -> Result<(), RepositoryError> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("add_range failed".to_string()));
        }

        let envelopes: Vec<EventEnvelope> = records
            .iter()
            .map(|r| EventEnvelope::from_event(&r.recorded_event()))
            .collect::<Result<_, _>>()?;

        self.rows.lock().unwrap().extend_from_slice(records);
        self.staged.lock().unwrap().extend(envelopes);
        Ok(())
    }

    async fn update_range(&self, records: &[BankTransaction]) -> Result<(), RepositoryError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("update_range failed".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        for record in records {
            if let Some(existing) = rows
                .iter_mut()
                .find(|r| r.external_id == record.external_id)
            {
                existing.amount = record.amount;
                existing.name = record.name.clone();
                existing.date = record.date;
                existing.categories = record.categories.clone();
                existing.merchant_name = record.merchant_name.clone();
            }
        }
        Ok(())
    }

    async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<BankTransaction>, RepositoryError> {
        Ok(self.by_external_id(external_id))
    }

    async fn mark_removed(&self, external_ids: &[String]) -> Result<u64, RepositoryError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("mark_removed failed".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        let mut affected = 0;
        for row in rows.iter_mut() {
            if external_ids.contains(&row.external_id) && !row.is_removed {
                row.is_removed = true;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

// =========================================================================
// Sync cursor repository
// =========================================================================

#[derive(Default)]
pub struct MemorySyncCursorRepository {
    cursors: Mutex<Vec<SyncCursor>>,
    pub fail_lookup: AtomicBool,
    pub link_updates: AtomicUsize,
}

impl MemorySyncCursorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, cursor: SyncCursor) {
        self.cursors.lock().unwrap().push(cursor);
    }

    pub fn stored_cursor(&self, user_id: Uuid, access_token: &str) -> Option<String> {
        self.cursors
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && c.access_token == access_token)
            .max_by_key(|c| c.last_synced)
            .map(|c| c.cursor.clone())
    }
}

#[async_trait]
impl SyncCursorRepository for MemorySyncCursorRepository {
    async fn get_last_cursor(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<SyncCursor>, RepositoryError> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("cursor lookup failed".to_string()));
        }

        Ok(self
            .cursors
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && c.access_token == access_token)
            .max_by_key(|c| c.last_synced)
            .cloned())
    }

    async fn save_cursor(
        &self,
        user_id: Uuid,
        access_token: &str,
        item_id: &str,
        cursor: &str,
        status: &str,
    ) -> Result<(), RepositoryError> {
        let mut cursors = self.cursors.lock().unwrap();
        if let Some(existing) = cursors.iter_mut().find(|c| {
            c.user_id == user_id && c.access_token == access_token && c.item_id == item_id
        }) {
            existing.cursor = cursor.to_string();
            existing.last_synced = Utc::now();
            existing.last_sync_status = status.to_string();
        } else {
            cursors.push(SyncCursor {
                id: Uuid::new_v4(),
                user_id,
                access_token: access_token.to_string(),
                item_id: item_id.to_string(),
                cursor: cursor.to_string(),
                last_synced: Utc::now(),
                last_sync_status: status.to_string(),
            });
        }
        Ok(())
    }

    async fn update_item_link(
        &self,
        user_id: Uuid,
        access_token: &str,
        item_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut cursors = self.cursors.lock().unwrap();
        for cursor in cursors.iter_mut() {
            if cursor.user_id == user_id
                && cursor.access_token == access_token
                && cursor.item_id != item_id
            {
                cursor.item_id = item_id.to_string();
                self.link_updates.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

// =========================================================================
// Transaction feed
// =========================================================================

#[derive(Default)]
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<FeedPage>>,
    /// Every request the reconciler made, in order
    pub requests: Mutex<Vec<(Option<String>, i64)>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(page: FeedPage) -> Self {
        let feed = Self::new();
        feed.enqueue(page);
        feed
    }

    pub fn enqueue(&self, page: FeedPage) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn cursors_seen(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }
}

#[async_trait]
impl TransactionFeed for ScriptedFeed {
    async fn fetch_page(&self, request: &FeedRequest) -> Result<FeedPage, FeedError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.cursor.clone(), request.count));

        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FeedError::Request("no scripted page left".to_string()))
    }
}

// =========================================================================
// Notification sink
// =========================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub pushes: Mutex<Vec<(Uuid, Notification)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn push(
        &self,
        user_id: Uuid,
        notification: Notification,
    ) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Push("push hub down".to_string()));
        }
        self.pushes.lock().unwrap().push((user_id, notification));
        Ok(())
    }
}
