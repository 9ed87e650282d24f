//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutService                                                        │
//! │       │                                                                 │
//! │       │  db.orders().update(&order, expected_version)                   │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── insert(&self, order)                                               │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── update(&self, order, expected_version)   ← optimistic check        │
//! │  └── history(&self, id)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog view and stock
//! - [`CouponRepository`](coupon::CouponRepository) - coupons and redemptions
//! - [`OrderRepository`](order::OrderRepository) - orders and history
//! - [`InventoryRepository`](inventory::InventoryRepository) - stock movements

pub mod coupon;
pub mod inventory;
pub mod order;
pub mod product;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use emporium_core::{
        Actor, Cart, LineItem, Money, NewOrder, Order, OrderLifecycle, PaymentMethod,
        PricingEngine, PricingMode, Product, ShippingAddress, ShippingMethod,
    };
    use uuid::Uuid;

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(id: &str, price: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            unit_price: Money::from_minor(price),
            stock_quantity: stock,
        }
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

    /// A freshly created order for `customer` with two lines.
    pub fn order(customer: &str) -> Order {
        order_with_coupon(customer, None)
    }

    /// Like [`order`], with `coupon` named on the cart.
    pub fn order_with_coupon(customer: &str, coupon: Option<&str>) -> Order {
        let mut cart = Cart::new();
        cart.add_item(
            LineItem::new("kurta", "Kurta", Money::from_minor(50_000), 2, Some("M".into()))
                .unwrap(),
        )
        .unwrap();
        cart.add_item(LineItem::new("mug", "Mug", Money::from_minor(30_000), 1, None).unwrap())
            .unwrap();
        if let Some(code) = coupon {
            cart.apply_coupon(code).unwrap();
        }

        let now = Utc::now();
        let summary = PricingEngine::default()
            .compute_summary(&cart, None, ShippingMethod::Standard, PricingMode::Checkout, now)
            .unwrap();

        OrderLifecycle::default()
            .create_order(NewOrder {
                id: Uuid::new_v4(),
                customer_id: customer.to_string(),
                cart,
                summary,
                shipping_method: ShippingMethod::Standard,
                shipping_address: address(),
                payment_method: PaymentMethod::Card,
                actor: Actor::customer(customer),
                at: now,
            })
            .unwrap()
            .order
    }
}
