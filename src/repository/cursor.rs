//! Sync Cursor Repository
//!
//! One logical cursor per (user, external item). Updated after every
//! successful feed pull; never rewound except by explicit reset.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Stored position in an external transaction feed
#[derive(Debug, Clone)]
pub struct SyncCursor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub item_id: String,
    pub cursor: String,
    pub last_synced: DateTime<Utc>,
    pub last_sync_status: String,
}

/// Cursor repository consumed by the sync reconciler
#[async_trait]
pub trait SyncCursorRepository: Send + Sync {
    /// Most recently stored cursor for (user, access token), if any
    async fn get_last_cursor(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<SyncCursor>, RepositoryError>;

    /// Persist the new feed position. This is the reconciler's final write.
    async fn save_cursor(
        &self,
        user_id: Uuid,
        access_token: &str,
        item_id: &str,
        cursor: &str,
        status: &str,
    ) -> Result<(), RepositoryError>;

    /// Refresh the access-token/item-id link, touching the row only when the
    /// item id actually changed
    async fn update_item_link(
        &self,
        user_id: Uuid,
        access_token: &str,
        item_id: &str,
    ) -> Result<(), RepositoryError>;
}

/// Postgres-backed cursor repository
#[derive(Debug, Clone)]
pub struct PgSyncCursorRepository {
    pool: PgPool,
}

impl PgSyncCursorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncCursorRepository for PgSyncCursorRepository {
    async fn get_last_cursor(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<SyncCursor>, RepositoryError> {
        let row: Option<(Uuid, Uuid, String, String, String, DateTime<Utc>, String)> =
            sqlx::query_as(
                r#"
                SELECT id, user_id, access_token, item_id, cursor, last_synced, last_sync_status
                FROM sync_cursors
                WHERE user_id = $1 AND access_token = $2
                ORDER BY last_synced DESC
                LIMIT 1
                "#,
            )
            .bind(user_id)
            .bind(access_token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(
            |(id, user_id, access_token, item_id, cursor, last_synced, last_sync_status)| {
                SyncCursor {
                    id,
                    user_id,
                    access_token,
                    item_id,
                    cursor,
                    last_synced,
                    last_sync_status,
                }
            },
        ))
    }

    async fn save_cursor(
        &self,
        user_id: Uuid,
        access_token: &str,
        item_id: &str,
        cursor: &str,
        status: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursors
                (id, user_id, access_token, item_id, cursor, last_synced, last_sync_status)
            VALUES ($1, $2, $3, $4, $5, NOW(), $6)
            ON CONFLICT (user_id, access_token, item_id)
            DO UPDATE SET cursor = $5, last_synced = NOW(), last_sync_status = $6
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(access_token)
        .bind(item_id)
        .bind(cursor)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_item_link(
        &self,
        user_id: Uuid,
        access_token: &str,
        item_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE sync_cursors
            SET item_id = $3
            WHERE user_id = $1
              AND access_token = $2
              AND item_id IS DISTINCT FROM $3
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
