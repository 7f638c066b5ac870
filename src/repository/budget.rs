//! Budget Repository
//!
//! Persists the budget ledger. Saving a budget flushes its pending events
//! into the outbox inside the same transaction as the row update, so the new
//! state and the fact that its events occurred land together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::aggregate::{AggregateRoot, Budget};
use crate::domain::EventEnvelope;
use crate::outbox::PgOutboxStore;

use super::RepositoryError;

/// Ledger repository consumed by event handlers and the web layer
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Find the active budget for (category, user, month of `date`)
    async fn get_by_category(
        &self,
        category: &str,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Budget>, RepositoryError>;

    /// Persist a mutated budget and stage its pending events
    async fn update(&self, budget: &mut Budget) -> Result<(), RepositoryError>;
}

/// Postgres-backed budget repository
#[derive(Debug, Clone)]
pub struct PgBudgetRepository {
    pool: PgPool,
}

impl PgBudgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drain the aggregate's pending events into envelopes.
    ///
    /// The list is cleared here so a repeated save cannot re-emit.
    fn drain_envelopes(budget: &mut Budget) -> Result<Vec<EventEnvelope>, RepositoryError> {
        budget
            .take_events()
            .iter()
            .map(EventEnvelope::from_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl BudgetRepository for PgBudgetRepository {
    async fn get_by_category(
        &self,
        category: &str,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Budget>, RepositoryError> {
        let row: Option<(
            Uuid,
            Uuid,
            String,
            String,
            Decimal,
            Decimal,
            DateTime<Utc>,
            bool,
        )> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, category, total_amount, spent_amount, created_date, is_active
            FROM budgets
            WHERE category = $1
              AND user_id = $2
              AND is_active
              AND date_trunc('month', created_date) = date_trunc('month', $3::date)
            "#,
        )
        .bind(category)
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(id, user_id, title, category, total, spent, created_date, is_active)| {
                Budget::from_stored(
                    id,
                    user_id,
                    title,
                    category,
                    total,
                    spent,
                    created_date,
                    is_active,
                )
            },
        ))
    }

    async fn update(&self, budget: &mut Budget) -> Result<(), RepositoryError> {
        let envelopes = Self::drain_envelopes(budget)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE budgets
            SET title = $2, total_amount = $3, spent_amount = $4, is_active = $5
            WHERE id = $1
            "#,
        )
        .bind(budget.id())
        .bind(budget.title())
        .bind(budget.total_amount())
        .bind(budget.spent_amount())
        .bind(budget.is_active())
        .execute(&mut *tx)
        .await?;

        PgOutboxStore::stage(&mut tx, &envelopes).await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_drain_envelopes_clears_pending() {
        let mut budget =
            Budget::create(Uuid::new_v4(), "Rent", dec!(1000), "rent", Utc::now()).unwrap();
        budget.apply_transaction(dec!(-1200)).unwrap();
        assert_eq!(budget.pending_events().len(), 1);

        let envelopes = PgBudgetRepository::drain_envelopes(&mut budget).unwrap();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].event_type, "BudgetExceeded");
        assert!(budget.pending_events().is_empty());
    }
}
