//! Bank Transaction Repository
//!
//! Local copies of externally synced transactions. The external id is the
//! uniqueness key; records are soft-deleted via `is_removed` so historical
//! ledger state stays reconstructable.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{EventEnvelope, LedgerEvent, TransactionRecorded};
use crate::outbox::PgOutboxStore;

use super::RepositoryError;

/// One locally persisted external transaction
#[derive(Debug, Clone)]
pub struct BankTransaction {
    pub id: Uuid,
    pub external_id: String,
    pub account_id: String,
    pub user_id: Uuid,
    /// Signed amount, outflows negative
    pub amount: Decimal,
    pub name: String,
    pub date: NaiveDate,
    pub categories: Vec<String>,
    pub merchant_name: Option<String>,
    pub is_removed: bool,
}

impl BankTransaction {
    /// The `TransactionRecorded` event announcing this record to the ledger
    pub fn recorded_event(&self) -> LedgerEvent {
        LedgerEvent::TransactionRecorded(TransactionRecorded {
            transaction_id: self.id,
            external_id: self.external_id.clone(),
            user_id: self.user_id,
            amount: self.amount,
            name: self.name.clone(),
            category: self.categories.first().cloned(),
            date: self.date,
            occurred_at: Utc::now(),
        })
    }
}

/// External-transaction repository consumed by the sync reconciler
#[async_trait]
pub trait BankTransactionRepository: Send + Sync {
    /// Which of the given external ids already exist locally
    async fn existing_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashSet<String>, RepositoryError>;

    /// Bulk-insert net-new records, all-or-nothing, staging one
    /// `TransactionRecorded` outbox event per record in the same transaction
    async fn add_range(&self, records: &[BankTransaction]) -> Result<(), RepositoryError>;

    /// Batch in-place field updates (amount, name, date, categories,
    /// merchant), one transaction
    async fn update_range(&self, records: &[BankTransaction]) -> Result<(), RepositoryError>;

    /// Look up a single record by external id
    async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<BankTransaction>, RepositoryError>;

    /// Soft-delete matching records; returns how many rows changed
    async fn mark_removed(&self, external_ids: &[String]) -> Result<u64, RepositoryError>;
}

/// Postgres-backed bank transaction repository
#[derive(Debug, Clone)]
pub struct PgBankTransactionRepository {
    pool: PgPool,
}

impl PgBankTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BankTransactionRepository for PgBankTransactionRepository {
    async fn existing_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashSet<String>, RepositoryError> {
        if external_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT external_id FROM bank_transactions WHERE external_id = ANY($1)
            "#,
        )
        .bind(external_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn add_range(&self, records: &[BankTransaction]) -> Result<(), RepositoryError> {
        if records.is_empty() {
            return Ok(());
        }

        let envelopes = records
            .iter()
            .map(|r| EventEnvelope::from_event(&r.recorded_event()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO bank_transactions
                    (id, external_id, account_id, user_id, amount, name, date,
                     categories, merchant_name, is_removed)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
                "#,
            )
            .bind(record.id)
            .bind(&record.external_id)
            .bind(&record.account_id)
            .bind(record.user_id)
            .bind(record.amount)
            .bind(&record.name)
            .bind(record.date)
            .bind(&record.categories)
            .bind(&record.merchant_name)
            .execute(&mut *tx)
            .await?;
        }

        PgOutboxStore::stage(&mut tx, &envelopes).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn update_range(&self, records: &[BankTransaction]) -> Result<(), RepositoryError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                UPDATE bank_transactions
                SET amount = $2, name = $3, date = $4, categories = $5, merchant_name = $6
                WHERE external_id = $1
                "#,
            )
            .bind(&record.external_id)
            .bind(record.amount)
            .bind(&record.name)
            .bind(record.date)
            .bind(&record.categories)
            .bind(&record.merchant_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<BankTransaction>, RepositoryError> {
        let row: Option<(
            Uuid,
            String,
            String,
            Uuid,
            Decimal,
            String,
            NaiveDate,
            Vec<String>,
            Option<String>,
            bool,
        )> = sqlx::query_as(
            r#"
            SELECT id, external_id, account_id, user_id, amount, name, date,
                   categories, merchant_name, is_removed
            FROM bank_transactions
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(
                id,
                external_id,
                account_id,
                user_id,
                amount,
                name,
                date,
                categories,
                merchant_name,
                is_removed,
            )| BankTransaction {
                id,
                external_id,
                account_id,
                user_id,
                amount,
                name,
                date,
                categories,
                merchant_name,
                is_removed,
            },
        ))
    }

    async fn mark_removed(&self, external_ids: &[String]) -> Result<u64, RepositoryError> {
        if external_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE bank_transactions
            SET is_removed = TRUE
            WHERE external_id = ANY($1) AND NOT is_removed
            "#,
        )
        .bind(external_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_recorded_event_carries_primary_category() {
        let record = BankTransaction {
            id: Uuid::new_v4(),
            external_id: "ext-9".to_string(),
            account_id: "acc-1".to_string(),
            user_id: Uuid::new_v4(),
            amount: dec!(-45.10),
            name: "Grocer".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            categories: vec!["groceries".to_string(), "food".to_string()],
            merchant_name: None,
            is_removed: false,
        };

        match record.recorded_event() {
            LedgerEvent::TransactionRecorded(e) => {
                assert_eq!(e.category.as_deref(), Some("groceries"));
                assert_eq!(e.amount, dec!(-45.10));
                assert_eq!(e.external_id, "ext-9");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
