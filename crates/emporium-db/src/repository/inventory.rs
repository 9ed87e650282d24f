//! # Inventory Repository
//!
//! Applies inventory effects to `products.stock_quantity` through a movement
//! ledger, so each effect lands at most once per order line.
//!
//! ## Movement Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind        precondition                     stock change              │
//! │  ─────────   ─────────────────────────────    ────────────              │
//! │  decrement   none for this (order, line)      -quantity                 │
//! │  release     decrement recorded, not undone   +decremented quantity     │
//! │  restock     decrement recorded, not undone   +decremented quantity     │
//! │                                                                         │
//! │  Replays hit the (order_id, product_id, variant_key, kind) primary key  │
//! │  and change nothing.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A release for an order that was never decremented (cancelled before
//! payment) is recorded as a no-op.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use emporium_core::InventoryLine;

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    Decrement,
    Release,
    Restock,
}

impl MovementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Decrement => "decrement",
            MovementKind::Release => "release",
            MovementKind::Restock => "restock",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository for stock movements.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Applies one movement for an order line.
    ///
    /// ## Returns
    /// The stock delta actually applied (0 for replays and no-op releases).
    pub async fn apply(
        &self,
        order_id: Uuid,
        line: &InventoryLine,
        kind: MovementKind,
    ) -> DbResult<i64> {
        let order_key = order_id.to_string();
        let variant = line.variant_key.as_deref().unwrap_or("");
        let mut tx = self.pool.begin().await?;

        let delta = match kind {
            MovementKind::Decrement => -(line.quantity as i64),
            MovementKind::Release | MovementKind::Restock => {
                let decremented =
                    recorded(&mut tx, &order_key, line, MovementKind::Decrement).await?;
                let undone = recorded(&mut tx, &order_key, line, MovementKind::Release).await?
                    + recorded(&mut tx, &order_key, line, MovementKind::Restock).await?;
                if decremented == 0 || undone > 0 {
                    debug!(
                        order_id = %order_id,
                        product_id = %line.product_id,
                        kind = %kind,
                        "Nothing to return to stock"
                    );
                    tx.rollback().await?;
                    return Ok(0);
                }
                decremented
            }
        };

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO inventory_movements (
                order_id, product_id, variant_key, kind, quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order_key)
        .bind(&line.product_id)
        .bind(variant)
        .bind(kind.as_str())
        .bind(delta.abs())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            debug!(
                order_id = %order_id,
                product_id = %line.product_id,
                kind = %kind,
                "Movement replay ignored"
            );
            tx.rollback().await?;
            return Ok(0);
        }

        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?1, updated_at = ?2
            WHERE id = ?3
            RETURNING stock_quantity
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(&line.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(stock) = stock else {
            tx.rollback().await?;
            return Err(DbError::not_found("Product", &line.product_id));
        };

        tx.commit().await?;

        if stock < 0 {
            warn!(product_id = %line.product_id, stock, "Stock went negative");
        }
        debug!(
            order_id = %order_id,
            product_id = %line.product_id,
            kind = %kind,
            delta,
            stock,
            "Inventory movement applied"
        );

        Ok(delta)
    }
}

/// Quantity recorded for a movement of `kind` on this order line (0 if none).
async fn recorded(
    tx: &mut Transaction<'_, Sqlite>,
    order_key: &str,
    line: &InventoryLine,
    kind: MovementKind,
) -> DbResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT quantity FROM inventory_movements
        WHERE order_id = ?1 AND product_id = ?2 AND variant_key = ?3 AND kind = ?4
        "#,
    )
    .bind(order_key)
    .bind(&line.product_id)
    .bind(line.variant_key.as_deref().unwrap_or(""))
    .bind(kind.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(quantity.unwrap_or(0))
}
