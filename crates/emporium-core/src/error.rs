//! # Error Types
//!
//! Domain-specific error types for emporium-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  emporium-core errors (this file)                                      │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── CoreError        - Cart mutations (stock, limits, missing lines)  │
//! │  ├── PricingError     - EmptyCart, InvalidCoupon { reason }            │
//! │  └── LifecycleError   - Rejected order transitions                     │
//! │                                                                         │
//! │  emporium-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront-api errors                                                 │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recovery Rules
//! - Pricing errors are recoverable locally (pick another coupon, fix the
//!   cart). They never corrupt the cart.
//! - Lifecycle errors leave the order exactly as it was.
//! - `ConcurrentModification` is retryable: re-fetch and reapply.
//! - A declined payment is NOT an error; it is the `FailPayment` transition.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::order::{EventKind, OrderState};
use crate::types::ActorRole;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and catalog rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to add the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "kurta-01", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// No line with this `(product_id, variant_key)` exists in the cart.
    #[error("Line not in cart: {product_id} ({variant})")]
    LineNotFound { product_id: String, variant: String },

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity would exceed the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: u64, max: u32 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed PIN code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not one of the accepted options.
    #[error("{field} does not accept '{value}'")]
    NotAllowed { field: String, value: String },
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Why a coupon was refused.
///
/// The validation steps run in a fixed order (window, usage, minimum order),
/// so each rejection names the first rule that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    /// The coupon store has no coupon with this code.
    NotFound,
    /// The coupon handed to the engine is not the one applied to the cart.
    CodeMismatch,
    /// `now < valid_from`.
    NotYetValid,
    /// `now > valid_to`.
    Expired,
    /// `used_count >= usage_limit`.
    UsageExhausted,
    /// `subtotal < min_order_amount`.
    BelowMinimumOrder,
}

impl CouponRejection {
    /// Stable machine-readable reason.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CouponRejection::NotFound => "not_found",
            CouponRejection::CodeMismatch => "code_mismatch",
            CouponRejection::NotYetValid => "not_yet_valid",
            CouponRejection::Expired => "expired",
            CouponRejection::UsageExhausted => "usage_exhausted",
            CouponRejection::BelowMinimumOrder => "below_minimum_order",
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A checkout summary was requested for a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The coupon failed validation.
    #[error("Coupon {code} rejected: {reason}")]
    InvalidCoupon {
        code: String,
        reason: CouponRejection,
    },
}

impl PricingError {
    pub fn invalid_coupon(code: impl Into<String>, reason: CouponRejection) -> Self {
        PricingError::InvalidCoupon {
            code: code.into(),
            reason,
        }
    }
}

// =============================================================================
// Lifecycle Error
// =============================================================================

/// Rejected order operations. A rejected transition never mutates the order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// No row in the transition table for `(from, event)`.
    #[error("Invalid transition: {event} is not allowed from {from}")]
    InvalidTransition { from: OrderState, event: EventKind },

    /// The order is Delivered or Cancelled.
    #[error("Order {order_id} is in terminal state {state}")]
    TerminalState { order_id: String, state: OrderState },

    /// The actor may not request this event (or does not own the order).
    #[error("Actor with role {role} may not request {event}")]
    Unauthorized { role: ActorRole, event: EventKind },

    /// Payment was retried the configured number of times.
    #[error("Payment retry limit of {limit} reached")]
    RetryLimitExceeded { limit: u32 },

    /// Another writer changed the order first; re-fetch and reapply.
    #[error("Order {order_id} was modified concurrently (expected version {expected_version})")]
    ConcurrentModification {
        order_id: String,
        expected_version: u64,
    },

    /// An order could not be created from the given checkout data.
    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl LifecycleError {
    /// True for errors the caller should resolve by reloading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::ConcurrentModification { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;
pub type PricingResult<T> = Result<T, PricingError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;

// =============================================================================
// Unit Tests
// =============================================================================
