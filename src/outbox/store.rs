//! Outbox Store
//!
//! Durable table of pending/processed event envelopes. Staging happens inside
//! the same transaction as the aggregate mutation (the dual-write solution);
//! draining and marking happen on the publisher's tick.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::EventEnvelope;

use super::OutboxMessage;

/// Errors from outbox persistence
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Used by non-database store implementations
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Read/mark side of the outbox, consumed by the publisher
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Fetch up to `limit` pending messages, ordered by creation time
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxMessage>, OutboxError>;

    /// Mark a batch of messages processed, in one transaction.
    ///
    /// `processed_at` is set once and never cleared.
    async fn mark_processed(
        &self,
        ids: &[Uuid],
        processed_at: DateTime<Utc>,
    ) -> Result<(), OutboxError>;
}

/// Postgres-backed outbox store
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stage envelopes as pending rows inside an already-open transaction.
    ///
    /// This is the write half of the dual-write guarantee: the caller commits
    /// the aggregate state change and these rows together or not at all.
    pub async fn stage(
        tx: &mut Transaction<'_, Postgres>,
        envelopes: &[EventEnvelope],
    ) -> Result<(), sqlx::Error> {
        for envelope in envelopes {
            sqlx::query(
                r#"
                INSERT INTO outbox_messages (id, aggregate_id, event_type, payload, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(envelope.aggregate_id.raw())
            .bind(&envelope.event_type)
            .bind(&envelope.payload)
            .bind(envelope.occurred_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxMessage>, OutboxError> {
        let rows: Vec<(
            Uuid,
            Uuid,
            String,
            serde_json::Value,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
        )> = sqlx::query_as(
            r#"
            SELECT id, aggregate_id, event_type, payload, created_at, processed_at
            FROM outbox_messages
            WHERE processed_at IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, aggregate_id, event_type, payload, created_at, processed_at)| OutboxMessage {
                    id,
                    aggregate_id,
                    event_type,
                    payload,
                    created_at,
                    processed_at,
                },
            )
            .collect())
    }

    async fn mark_processed(
        &self,
        ids: &[Uuid],
        processed_at: DateTime<Utc>,
    ) -> Result<(), OutboxError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE outbox_messages
            SET processed_at = $2
            WHERE id = ANY($1) AND processed_at IS NULL
            "#,
        )
        .bind(ids)
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
