//! # Order Repository
//!
//! Persistence for orders and their transition history.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders                                                                 │
//! │  ├── id, customer_id, state, payment_state, total, version  ← queryable │
//! │  └── document (JSON Order)                                  ← source    │
//! │                                                                         │
//! │  order_history (append-only, PK order_id + seq)                         │
//! │  └── one row per HistoryEntry, never updated or deleted                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Optimistic Concurrency
//! ```text
//! UPDATE orders SET ..., version = new
//! WHERE id = ? AND version = expected      ── 0 rows? ──► ConcurrentModification
//! ```
//! Orders are never deleted. An order that used a coupon is only stored
//! together with its redemption.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use super::coupon;
use crate::error::{DbError, DbResult};
use emporium_core::{Actor, EventKind, HistoryEntry, Order, OrderState};

/// Row shape of `order_history`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct HistoryRow {
    from_state: Option<String>,
    to_state: String,
    event: String,
    actor_id: String,
    actor_role: String,
    note: Option<String>,
    at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryEntry {
            from: row
                .from_state
                .as_deref()
                .map(str::parse::<OrderState>)
                .transpose()?,
            to: row.to_state.parse()?,
            event: row.event.parse()?,
            at: row.at,
            actor: Actor {
                id: row.actor_id,
                role: row.actor_role.parse()?,
            },
            note: row.note,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a newly created order and its initial history, redeeming the
    /// order's coupon in the same transaction.
    ///
    /// ## Errors
    /// * `CouponExhausted` - the coupon ran out; nothing is written
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(order_id = %order.id(), customer_id = %order.customer_id(), "Inserting order");

        let document = serde_json::to_string(order)?;
        let mut tx = self.pool.begin().await?;

        if let Some(code) = order.coupon_code() {
            coupon::redeem(&mut *tx, code).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, state, payment_state, total, coupon_code,
                tracking_id, version, document, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.customer_id())
        .bind(order.state().as_str())
        .bind(order.payment_state().as_str())
        .bind(order.total().minor())
        .bind(order.coupon_code())
        .bind(order.tracking_id())
        .bind(order.version() as i64)
        .bind(&document)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("order id", order.id().to_string())
            }
            other => other,
        })?;

        append_history(&mut tx, order).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Loads an order.
    pub async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Order>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT document, version FROM orders WHERE id = ?1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        let Some((document, version)) = row else {
            return Ok(None);
        };

        let order: Order = serde_json::from_str(&document)?;
        if order.version() != version as u64 {
            return Err(DbError::InvalidData(format!(
                "order {} snapshot version {} does not match row version {}",
                id,
                order.version(),
                version
            )));
        }

        Ok(Some(order))
    }

    /// Saves a transitioned order if nobody else has saved since `expected_version`.
    ///
    /// ## Errors
    /// * `ConcurrentModification` - the stored version is no longer `expected_version`
    /// * `NotFound` - the order does not exist
    pub async fn update(&self, order: &Order, expected_version: u64) -> DbResult<()> {
        let document = serde_json::to_string(order)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET state = ?1, payment_state = ?2, tracking_id = ?3,
                version = ?4, document = ?5, updated_at = ?6
            WHERE id = ?7 AND version = ?8
            "#,
        )
        .bind(order.state().as_str())
        .bind(order.payment_state().as_str())
        .bind(order.tracking_id())
        .bind(order.version() as i64)
        .bind(&document)
        .bind(order.updated_at())
        .bind(order.id().to_string())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT version FROM orders WHERE id = ?1")
                    .bind(order.id().to_string())
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return match exists {
                Some(current) => {
                    warn!(
                        order_id = %order.id(),
                        expected_version,
                        current_version = current,
                        "Optimistic version check failed"
                    );
                    Err(DbError::conflict("Order", order.id().to_string(), expected_version))
                }
                None => Err(DbError::not_found("Order", order.id().to_string())),
            };
        }

        append_history(&mut tx, order).await?;
        tx.commit().await?;

        debug!(
            order_id = %order.id(),
            state = %order.state(),
            version = order.version(),
            "Order updated"
        );
        Ok(())
    }

    /// Transition history as stored in `order_history`, oldest first.
    pub async fn history(&self, id: Uuid) -> DbResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT from_state, to_state, event, actor_id, actor_role, note, at
            FROM order_history
            WHERE order_id = ?1
            ORDER BY seq
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    /// Most recent orders for a customer.
    pub async fn list_by_customer(&self, customer_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document FROM orders
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(customer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .collect()
    }

    /// Number of orders currently in `state`.
    pub async fn count_in_state(&self, state: OrderState) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE state = ?1")
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Writes any history entries not yet stored. `seq` is the entry's index, so
/// already-stored entries are skipped by the primary key.
async fn append_history(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> DbResult<()> {
    let order_id = order.id().to_string();

    for (seq, entry) in order.history().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO order_history (
                order_id, seq, from_state, to_state, event,
                actor_id, actor_role, note, at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order_id)
        .bind(seq as i64)
        .bind(entry.from.map(|s| s.as_str()))
        .bind(entry.to.as_str())
        .bind(entry.event.as_str())
        .bind(&entry.actor.id)
        .bind(entry.actor.role.as_str())
        .bind(entry.note.as_deref())
        .bind(entry.at)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, order, order_with_coupon};
    use chrono::Duration;
    use emporium_core::{
        Coupon, CouponKind, Money, OrderEvent, OrderLifecycle, PaymentState, TransitionRequest,
    };

    fn submit(order: &Order) -> Order {
        OrderLifecycle::default()
            .apply_transition(
                order,
                TransitionRequest::new(
                    OrderEvent::SubmitPayment,
                    Actor::customer(order.customer_id()),
                    Utc::now(),
                ),
            )
            .unwrap()
            .order
    }

    #[tokio::test]
    async fn test_insert_and_load() {
        let db = db().await;
        let placed = order("cust-1");
        db.orders().insert(&placed).await.unwrap();

        let loaded = db.orders().get_by_id(placed.id()).await.unwrap().unwrap();
        assert_eq!(loaded, placed);

        let history = db.orders().history(placed.id()).await.unwrap();
        assert_eq!(history, placed.history());

        assert!(db.orders().get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_appends_history() {
        let db = db().await;
        let placed = order("cust-1");
        db.orders().insert(&placed).await.unwrap();

        let pending = submit(&placed);
        db.orders().update(&pending, placed.version()).await.unwrap();

        let loaded = db.orders().get_by_id(placed.id()).await.unwrap().unwrap();
        assert_eq!(loaded.state(), OrderState::PaymentPending);
        assert_eq!(loaded.payment_state(), PaymentState::Pending);
        assert_eq!(loaded.version(), 2);

        let history = db.orders().history(placed.id()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].event, EventKind::SubmitPayment);
        assert_eq!(history[1].from, Some(OrderState::Created));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let db = db().await;
        let placed = order("cust-1");
        db.orders().insert(&placed).await.unwrap();

        let pending = submit(&placed);
        db.orders().update(&pending, 1).await.unwrap();

        // A second writer that also read version 1
        let err = db.orders().update(&pending, 1).await.unwrap_err();
        assert!(err.is_conflict());

        let loaded = db.orders().get_by_id(placed.id()).await.unwrap().unwrap();
        assert_eq!(loaded.version(), 2);
        assert_eq!(db.orders().history(placed.id()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let db = db().await;
        let err = db.orders().update(&order("cust-1"), 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        let db = db().await;
        let placed = order("cust-1");
        db.orders().insert(&placed).await.unwrap();

        let err = db.orders().insert(&placed).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_insert_redeems_coupon_atomically() {
        let db = db().await;
        db.coupons()
            .insert(&Coupon {
                code: "ONCE".into(),
                kind: CouponKind::FixedAmount {
                    amount: Money::from_minor(5_000),
                },
                min_order_amount: Money::zero(),
                valid_from: Utc::now() - Duration::days(1),
                valid_to: Utc::now() + Duration::days(1),
                usage_limit: Some(1),
                used_count: 0,
            })
            .await
            .unwrap();

        let first = order_with_coupon("cust-1", Some("ONCE"));
        db.orders().insert(&first).await.unwrap();

        let second = order_with_coupon("cust-2", Some("ONCE"));
        let err = db.orders().insert(&second).await.unwrap_err();
        assert!(matches!(err, DbError::CouponExhausted { .. }));

        // Rolled back: the second order was never stored
        assert!(db.orders().get_by_id(second.id()).await.unwrap().is_none());
        assert_eq!(db.orders().count_in_state(OrderState::Created).await.unwrap(), 1);
        let coupon = db.coupons().get_by_code("ONCE").await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let db = db().await;
        for _ in 0..3 {
            db.orders().insert(&order("cust-1")).await.unwrap();
        }
        db.orders().insert(&order("cust-2")).await.unwrap();

        assert_eq!(db.orders().list_by_customer("cust-1", 10).await.unwrap().len(), 3);
        assert_eq!(db.orders().list_by_customer("cust-1", 2).await.unwrap().len(), 2);
        assert_eq!(db.orders().count_in_state(OrderState::Created).await.unwrap(), 4);
    }
}
