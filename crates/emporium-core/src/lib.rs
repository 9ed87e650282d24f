//! # emporium-core: Pricing and Order Lifecycle for Emporium
//!
//! Pure business logic for the storefront checkout path: carts, coupons, the
//! pricing engine and the order state machine. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Emporium Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Storefront / Admin console (HTTP JSON)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   storefront-api (axum)                         │   │
//! │  │   cart summary, checkout, order events, effect dispatch         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ emporium-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌──────────┐  ┌─────────────────┐   │   │
//! │  │   │  cart   │  │ coupon  │  │ pricing  │  │   lifecycle     │   │   │
//! │  │   │LineItem │  │ rules   │  │ Summary  │  │ Order + Effects │   │   │
//! │  │   └─────────┘  └─────────┘  └──────────┘  └─────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              emporium-db (SQLite repositories)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - integer minor-unit Money
//! - [`types`] - products, shipping, payment methods, actors
//! - [`cart`] - line items and the cart
//! - [`coupon`] - coupon snapshots and their rules
//! - [`pricing`] - the pricing engine
//! - [`order`] - order record, states and events
//! - [`lifecycle`] - the order state machine
//! - [`error`] - domain error types
//! - [`validation`] - input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; time is always a parameter
//! 2. **Integer Money**: all amounts are paise in an i64
//! 3. **Declared Effects**: the lifecycle returns what to do, callers do it
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use emporium_core::{Cart, LineItem, Money, PricingEngine, PricingMode, ShippingMethod};
//!
//! let mut cart = Cart::new();
//! cart.add_item(LineItem::new("tee", "Tee", Money::from_minor(59_900), 1, None).unwrap())
//!     .unwrap();
//!
//! let summary = PricingEngine::default()
//!     .compute_summary(&cart, None, ShippingMethod::Standard, PricingMode::Preview, Utc::now())
//!     .unwrap();
//!
//! // ₹599 + ₹100 shipping + 18% tax on ₹599
//! assert_eq!(summary.total.minor(), 59_900 + 10_000 + 10_782);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod coupon;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod order;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, LineItem};
pub use coupon::{Coupon, CouponKind};
pub use error::{
    CoreError, CouponRejection, LifecycleError, PricingError, ValidationError,
};
pub use lifecycle::{
    Effect, InventoryLine, LifecycleConfig, NewOrder, OrderLifecycle, Transition,
    TransitionRequest,
};
pub use money::Money;
pub use order::{EventKind, HistoryEntry, Order, OrderEvent, OrderState, PaymentState};
pub use pricing::{PriceSummary, PricingConfig, PricingEngine, PricingMode, ShippingRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single line
///
/// ## Business Reason
/// Catches typos like 1000 instead of 10 before they reach checkout.
pub const MAX_ITEM_QUANTITY: u32 = 999;

/// RetryPayment transitions allowed per order unless configured otherwise.
pub const DEFAULT_MAX_PAYMENT_RETRIES: u32 = 3;
