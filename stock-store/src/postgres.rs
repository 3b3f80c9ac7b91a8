//! PostgreSQL stock ledger.
//!
//! Atomicity comes from the database, not from the process: a decrement is a
//! single conditional `UPDATE ... WHERE quantity_on_hand + $2 >= 0`. The row
//! lock taken by the update serializes concurrent writers, and PostgreSQL
//! re-evaluates the guard against the row version committed by the previous
//! writer, so several service instances can share one table safely. A
//! rejected decrement is classified under `SELECT ... FOR UPDATE`, never from
//! an unlocked read.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.

use crate::error::StoreError;
use crate::repository::{replay_receipt, StockLedger};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use std::sync::Arc;
use stock_domain::{Adjustment, IdempotencyKey, ProductId, StockLevel, StockRecord};
use tracing::debug;

/// PostgreSQL adapter for the `product_stock` table.
pub struct PgStockLedger {
    /// PostgreSQL connection pool
    pool: Arc<PgPool>,
}

impl PgStockLedger {
    /// Create a new PostgreSQL ledger.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Conditional decrement. `None` when the row is missing or the guard fails.
async fn guarded_decrement(
    conn: &mut PgConnection,
    product_id: ProductId,
    delta: i64,
) -> Result<Option<i64>, StoreError> {
    let quantity = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE product_stock
        SET quantity_on_hand = quantity_on_hand + $2,
            updated_at = NOW()
        WHERE product_id = $1
          AND quantity_on_hand + $2 >= 0
        RETURNING quantity_on_hand
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .fetch_optional(conn)
    .await?;

    Ok(quantity)
}

/// Decide the outcome of a decrement whose guarded update matched no row.
///
/// The update's snapshot can predate a concurrent create, so the row is
/// re-read under `FOR UPDATE`. If the locked value covers the delta the
/// update is applied now; otherwise the rejection is classified as
/// `NotFound` or `InsufficientStock` against that locked value.
async fn settle_rejected_decrement(
    conn: &mut PgConnection,
    product_id: ProductId,
    delta: i64,
) -> Result<StockLevel, StoreError> {
    let current: Option<i64> = sqlx::query_scalar::<_, i64>(
        "SELECT quantity_on_hand FROM product_stock WHERE product_id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let available = match current {
        Some(available) => to_level(available)?,
        None => return Err(StoreError::not_found(product_id)),
    };
    if available.apply(delta)?.is_none() {
        return Err(StoreError::insufficient(product_id, available, delta));
    }

    // Row is locked, so the guard sees `available`.
    let quantity = guarded_decrement(conn, product_id, delta)
        .await?
        .ok_or_else(|| StoreError::insufficient(product_id, available, delta))?;
    to_level(quantity)
}

fn to_level(value: i64) -> Result<StockLevel, StoreError> {
    StockLevel::new(value)
        .map_err(|e| StoreError::Deserialization(format!("Invalid quantity_on_hand {}: {}", value, e)))
}

#[async_trait]
impl StockLedger for PgStockLedger {
    async fn adjust(
        &self,
        product_id: ProductId,
        delta: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Adjustment, StoreError> {
        // Dropping the transaction without commit rolls it back, so a
        // cancelled future leaves neither the stock change nor the key claim.
        let mut tx = self.pool.begin().await?;

        if let Some(key) = idempotency_key {
            // A concurrent holder of the same key blocks this insert until it
            // commits or rolls back.
            let claimed = sqlx::query(
                r#"
                INSERT INTO stock_adjustments (idempotency_key, product_id, delta)
                VALUES ($1, $2, $3)
                ON CONFLICT (idempotency_key) DO NOTHING
                "#,
            )
            .bind(key.as_str())
            .bind(product_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                == 1;

            if !claimed {
                let row = sqlx::query(
                    r#"
                    SELECT product_id, delta, new_quantity
                    FROM stock_adjustments
                    WHERE idempotency_key = $1
                    "#,
                )
                .bind(key.as_str())
                .fetch_one(&mut *tx)
                .await?;

                let new_quantity: Option<i64> = row.try_get("new_quantity")?;
                let new_quantity = new_quantity.ok_or_else(|| {
                    StoreError::Deserialization(format!("Receipt {} has no new_quantity", key))
                })?;
                let prior = Adjustment::committed(
                    row.try_get("product_id")?,
                    row.try_get("delta")?,
                    to_level(new_quantity)?,
                );

                tx.rollback().await?;
                debug!(%product_id, key = %key, "Replaying idempotent adjustment");
                return replay_receipt(prior, product_id, delta, key);
            }
        }

        let new_quantity = if delta >= 0 {
            let quantity = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO product_stock (product_id, quantity_on_hand)
                VALUES ($1, $2)
                ON CONFLICT (product_id) DO UPDATE
                SET quantity_on_hand = product_stock.quantity_on_hand + EXCLUDED.quantity_on_hand,
                    updated_at = NOW()
                RETURNING quantity_on_hand
                "#,
            )
            .bind(product_id)
            .bind(delta)
            .fetch_one(&mut *tx)
            .await?;
            to_level(quantity)?
        } else {
            match guarded_decrement(&mut *tx, product_id, delta).await? {
                Some(quantity) => to_level(quantity)?,
                None => settle_rejected_decrement(&mut *tx, product_id, delta).await?,
            }
        };

        if let Some(key) = idempotency_key {
            sqlx::query("UPDATE stock_adjustments SET new_quantity = $2 WHERE idempotency_key = $1")
                .bind(key.as_str())
                .bind(new_quantity.get())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Adjustment::committed(product_id, delta, new_quantity))
    }

    async fn find_record(&self, product_id: ProductId) -> Result<Option<StockRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT product_id, quantity_on_hand, updated_at
            FROM product_stock
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|row| -> Result<StockRecord, StoreError> {
            Ok(StockRecord {
                product_id: row.try_get("product_id")?,
                quantity_on_hand: to_level(row.try_get("quantity_on_hand")?)?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    async fn set(&self, product_id: ProductId, quantity: StockLevel) -> Result<StockRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, quantity_on_hand)
            VALUES ($1, $2)
            ON CONFLICT (product_id) DO UPDATE
            SET quantity_on_hand = EXCLUDED.quantity_on_hand,
                updated_at = NOW()
            RETURNING product_id, quantity_on_hand, updated_at
            "#,
        )
        .bind(product_id)
        .bind(quantity.get())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(StockRecord {
            product_id: row.try_get("product_id")?,
            quantity_on_hand: to_level(row.try_get("quantity_on_hand")?)?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn provision(&self, product_id: ProductId, initial: StockLevel) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, quantity_on_hand)
            VALUES ($1, $2)
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(initial.get())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, product_id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM product_stock WHERE product_id = $1")
            .bind(product_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(product_id));
        }
        Ok(())
    }
}
