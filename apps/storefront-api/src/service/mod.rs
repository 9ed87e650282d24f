//! # Storefront Service
//!
//! Orchestrates the pure core against storage and collaborators.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Storefront Service                              │
//! │                                                                         │
//! │  checkout.rs  CartRequest ──► Catalog ──► Cart ──► PricingEngine        │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                             OrderLifecycle::create_order ──► insert     │
//! │                                                                         │
//! │  orders.rs    EventRequest ──► lock ──► load ──► apply_transition       │
//! │                                          ▲            │                 │
//! │                                          └─ conflict ◄┴─ update(v)      │
//! │                                                                         │
//! │  effects.rs   Effects ──► PaymentGateway / InventorySink / Notifier     │
//! │               capture outcome ──► ConfirmPayment / FailPayment          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Effects are executed only after the transition that declared them has been
//! saved, so a crash never leaves stock or payments ahead of the order record.

mod checkout;
mod effects;
mod orders;

use serde::Deserialize;

use emporium_core::{
    Actor, OrderEvent, OrderLifecycle, PaymentMethod, PricingEngine, ShippingAddress,
    ShippingMethod,
};
use emporium_db::Database;

use crate::collaborators::Collaborators;
use crate::config::{AppConfig, EffectSettings};
use crate::locks::OrderLocks;

pub use effects::GATEWAY_ACTOR_ID;

// =============================================================================
// Requests
// =============================================================================

/// One cart line as sent by the storefront. Name and price come from the
/// catalog, never from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_key: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    #[serde(default)]
    pub items: Vec<CartLineRequest>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub cart: CartRequest,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub event: OrderEvent,
    pub actor: Actor,
    #[serde(default)]
    pub note: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct Storefront {
    db: Database,
    collaborators: Collaborators,
    pricing: PricingEngine,
    lifecycle: OrderLifecycle,
    locks: OrderLocks,
    max_conflict_retries: u32,
    effects: EffectSettings,
}

impl Storefront {
    pub fn new(db: Database, collaborators: Collaborators, config: &AppConfig) -> Self {
        Storefront {
            db,
            collaborators,
            pricing: PricingEngine::new(config.pricing.to_pricing_config()),
            lifecycle: OrderLifecycle::new(config.lifecycle.to_lifecycle_config()),
            locks: OrderLocks::new(),
            max_conflict_retries: config.lifecycle.max_conflict_retries,
            effects: config.effects.clone(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use emporium_core::{Coupon, CouponKind, Money, Product};
    use emporium_db::DbConfig;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    use crate::collaborators::{CaptureOutcome, CollaboratorResult, PaymentGateway};

    /// Gateway answering every capture with a fixed outcome and recording
    /// refunds.
    #[derive(Debug)]
    pub struct FixedGateway {
        pub outcome: CaptureOutcome,
        pub refunds: Mutex<Vec<(Uuid, Money)>>,
    }

    impl FixedGateway {
        pub fn new(outcome: CaptureOutcome) -> Arc<Self> {
            Arc::new(FixedGateway {
                outcome,
                refunds: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn capture(
            &self,
            _order_id: Uuid,
            _amount: Money,
            _method: PaymentMethod,
        ) -> CollaboratorResult<CaptureOutcome> {
            Ok(self.outcome)
        }

        async fn refund(&self, order_id: Uuid, amount: Money) -> CollaboratorResult<()> {
            self.refunds.lock().unwrap().push((order_id, amount));
            Ok(())
        }
    }

    pub async fn db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, price, stock) in [("kurta", 50_000, 10), ("mug", 30_000, 5)] {
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: format!("Product {}", id),
                    unit_price: Money::from_minor(price),
                    stock_quantity: stock,
                })
                .await
                .unwrap();
        }
        db.coupons()
            .insert(&Coupon {
                code: "SAVE10".to_string(),
                kind: CouponKind::Percentage {
                    percent: 10,
                    max_discount: Some(Money::from_minor(10_000)),
                },
                min_order_amount: Money::zero(),
                valid_from: Utc::now() - Duration::days(1),
                valid_to: Utc::now() + Duration::days(1),
                usage_limit: Some(1),
                used_count: 0,
            })
            .await
            .unwrap();
        db
    }

    pub fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.effects.initial_backoff_ms = 1;
        config.effects.max_backoff_ms = 1;
        config
    }

    pub async fn storefront(outcome: CaptureOutcome) -> (Storefront, Arc<FixedGateway>) {
        let db = db().await;
        let gateway = FixedGateway::new(outcome);
        let collaborators = Collaborators::sqlite(&db).with_payments(gateway.clone());
        (Storefront::new(db, collaborators, &config()), gateway)
    }

    pub fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            phone: "+91 98450 00000".to_string(),
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560001".to_string(),
            country: "IN".to_string(),
        }
    }

    /// kurta(M) ×2 + mug ×1 = ₹1300.
    pub fn cart(coupon: Option<&str>) -> CartRequest {
        CartRequest {
            items: vec![
                CartLineRequest {
                    product_id: "kurta".to_string(),
                    variant_key: Some("M".to_string()),
                    quantity: 2,
                },
                CartLineRequest {
                    product_id: "mug".to_string(),
                    variant_key: None,
                    quantity: 1,
                },
            ],
            coupon_code: coupon.map(str::to_string),
            shipping_method: ShippingMethod::Standard,
        }
    }

    pub fn checkout_request(customer: &str, coupon: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: customer.to_string(),
            cart: cart(coupon),
            shipping_address: address(),
            payment_method: PaymentMethod::Upi,
        }
    }

    pub fn event(event: OrderEvent, actor: Actor) -> EventRequest {
        EventRequest {
            event,
            actor,
            note: None,
        }
    }
}
