//! # External Collaborators
//!
//! The services the core hands its declared effects to, behind async traits
//! so each can be swapped (SQLite today, a real gateway or message bus later).
//!
//! ```text
//!   Effect::CapturePayment      ──► PaymentGateway::capture
//!   Effect::RefundPayment       ──► PaymentGateway::refund
//!   Effect::DecrementInventory  ─┐
//!   Effect::ReleaseInventory    ─┼► InventorySink::apply
//!   Effect::Restock             ─┘
//!   Effect::Notify              ──► Notifier::notify
//!
//!   checkout reads              ──► Catalog, CouponStore
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use emporium_core::{Coupon, InventoryLine, Money, OrderState, PaymentMethod, Product};
use emporium_db::{Database, DbError, MovementKind};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

// =============================================================================
// Catalog and Coupons
// =============================================================================

/// Product lookup: id → name, unit price, stock.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_product(&self, id: &str) -> CollaboratorResult<Option<Product>>;
}

/// Coupon snapshots for pricing. Redemption is recorded by the order
/// insert itself.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn get_coupon(&self, code: &str) -> CollaboratorResult<Option<Coupon>>;
}

// =============================================================================
// Payments
// =============================================================================

/// Gateway answer to a capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Approved,
    Declined,
    /// Result arrives later through the order events endpoint.
    Pending,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(
        &self,
        order_id: Uuid,
        amount: Money,
        method: PaymentMethod,
    ) -> CollaboratorResult<CaptureOutcome>;

    async fn refund(&self, order_id: Uuid, amount: Money) -> CollaboratorResult<()>;
}

/// Gateway for deployments where payment results come in by webhook.
///
/// Every capture is `Pending`; refunds are logged for back-office handling.
#[derive(Debug, Default, Clone)]
pub struct ManualGateway;

#[async_trait]
impl PaymentGateway for ManualGateway {
    async fn capture(
        &self,
        order_id: Uuid,
        amount: Money,
        method: PaymentMethod,
    ) -> CollaboratorResult<CaptureOutcome> {
        info!(
            order_id = %order_id,
            amount = %amount,
            method = %method,
            "Payment capture requested"
        );
        Ok(CaptureOutcome::Pending)
    }

    async fn refund(&self, order_id: Uuid, amount: Money) -> CollaboratorResult<()> {
        info!(order_id = %order_id, amount = %amount, "Refund requested");
        Ok(())
    }
}

// =============================================================================
// Inventory and Notifications
// =============================================================================

/// Receives stock movements keyed by (product_id, variant_key, quantity).
#[async_trait]
pub trait InventorySink: Send + Sync {
    async fn apply(
        &self,
        order_id: Uuid,
        line: &InventoryLine,
        kind: MovementKind,
    ) -> CollaboratorResult<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, order_id: Uuid, state: OrderState);
}

/// Notifier that writes order state changes to the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, order_id: Uuid, state: OrderState) {
        info!(order_id = %order_id, state = %state, "Order state notification");
    }
}

// =============================================================================
// SQLite Implementations
// =============================================================================

/// Catalog, coupon store and inventory sink backed by the Emporium database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        SqliteStore { db }
    }
}

#[async_trait]
impl Catalog for SqliteStore {
    async fn get_product(&self, id: &str) -> CollaboratorResult<Option<Product>> {
        Ok(self.db.products().get_by_id(id).await?)
    }
}

#[async_trait]
impl CouponStore for SqliteStore {
    async fn get_coupon(&self, code: &str) -> CollaboratorResult<Option<Coupon>> {
        Ok(self.db.coupons().get_by_code(code).await?)
    }
}

#[async_trait]
impl InventorySink for SqliteStore {
    async fn apply(
        &self,
        order_id: Uuid,
        line: &InventoryLine,
        kind: MovementKind,
    ) -> CollaboratorResult<()> {
        self.db.inventory().apply(order_id, line, kind).await?;
        Ok(())
    }
}

// =============================================================================
// Collaborator Set
// =============================================================================

/// Everything the storefront service talks to besides the order repository.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn Catalog>,
    pub coupons: Arc<dyn CouponStore>,
    pub payments: Arc<dyn PaymentGateway>,
    pub inventory: Arc<dyn InventorySink>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// SQLite-backed catalog, coupons and inventory, a manual payment gateway
    /// and log notifications.
    pub fn sqlite(db: &Database) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));
        Collaborators {
            catalog: store.clone(),
            coupons: store.clone(),
            payments: Arc::new(ManualGateway),
            inventory: store,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replaces the payment gateway.
    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }

    /// Replaces the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_gateway_is_always_pending() {
        let outcome = ManualGateway
            .capture(Uuid::new_v4(), Money::from_minor(10_000), PaymentMethod::Upi)
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Pending);
    }

    #[tokio::test]
    async fn test_sqlite_catalog_lookup() {
        let db = Database::new(emporium_db::DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&Product {
                id: "tee".into(),
                name: "Tee".into(),
                unit_price: Money::from_minor(59_900),
                stock_quantity: 4,
            })
            .await
            .unwrap();

        let collaborators = Collaborators::sqlite(&db);
        let found = collaborators.catalog.get_product("tee").await.unwrap();
        assert_eq!(found.map(|p| p.stock_quantity), Some(4));
        assert!(collaborators.catalog.get_product("nope").await.unwrap().is_none());
        assert!(collaborators.coupons.get_coupon("NOPE").await.unwrap().is_none());
    }
}
