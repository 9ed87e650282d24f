//! # Pricing Engine
//!
//! Turns a cart, an optional coupon and a shipping method into a
//! `PriceSummary`.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. subtotal  = Σ unit_price × quantity                                 │
//! │                    │                                                    │
//! │  2. coupon    = validate(window → usage → minimum order)                │
//! │                    │                                                    │
//! │  3. discount  = percentage (floored, capped) | fixed (≤ subtotal)       │
//! │                    │                                                    │
//! │  4. net       = subtotal - discount                                     │
//! │                    │                                                    │
//! │  5. shipping  = rate(method), free when net >= free_above               │
//! │                    │                                                    │
//! │  6. tax       = net × tax_rate (half-up, shipping excluded)             │
//! │                    │                                                    │
//! │  7. total     = net + shipping + tax                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Worked Example
//! ```rust
//! use chrono::{Duration, Utc};
//! use emporium_core::{
//!     Cart, Coupon, CouponKind, LineItem, Money, PricingEngine, PricingMode, ShippingMethod,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_item(LineItem::new("kurta", "Kurta", Money::from_minor(50_000), 2, None).unwrap()).unwrap();
//! cart.add_item(LineItem::new("mug", "Mug", Money::from_minor(30_000), 1, None).unwrap()).unwrap();
//! cart.apply_coupon("SAVE10").unwrap();
//!
//! let now = Utc::now();
//! let coupon = Coupon {
//!     code: "SAVE10".into(),
//!     kind: CouponKind::Percentage { percent: 10, max_discount: Some(Money::from_minor(10_000)) },
//!     min_order_amount: Money::zero(),
//!     valid_from: now - Duration::days(1),
//!     valid_to: now + Duration::days(1),
//!     usage_limit: None,
//!     used_count: 0,
//! };
//!
//! let summary = PricingEngine::default()
//!     .compute_summary(&cart, Some(&coupon), ShippingMethod::Standard, PricingMode::Checkout, now)
//!     .unwrap();
//!
//! assert_eq!(summary.subtotal.minor(), 130_000);
//! assert_eq!(summary.discount.minor(), 10_000);
//! assert_eq!(summary.shipping_fee.minor(), 0);
//! assert_eq!(summary.tax.minor(), 21_600);
//! assert_eq!(summary.total.minor(), 141_600);
//! ```
//!
//! The engine is pure: no clocks, no I/O, no hidden state. `now` is an input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::coupon::Coupon;
use crate::error::{CouponRejection, PricingError, PricingResult};
use crate::money::Money;
use crate::types::{ShippingMethod, TaxRate};

/// Default GST rate applied to the discounted subtotal.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1800;

// =============================================================================
// Shipping Rates
// =============================================================================

/// Fee for one shipping method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRate {
    pub fee: Money,
    /// Net amount at or above which shipping is free. `None` = never free.
    pub free_above: Option<Money>,
}

impl ShippingRate {
    /// Fee charged for an order whose discounted subtotal is `net`.
    pub fn fee_for(&self, net: Money) -> Money {
        match self.free_above {
            Some(threshold) if net >= threshold => Money::zero(),
            _ => self.fee,
        }
    }
}

/// One rate per shipping method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRateTable {
    pub standard: ShippingRate,
    pub express: ShippingRate,
    pub store_pickup: ShippingRate,
}

impl ShippingRateTable {
    pub fn rate(&self, method: ShippingMethod) -> ShippingRate {
        match method {
            ShippingMethod::Standard => self.standard,
            ShippingMethod::Express => self.express,
            ShippingMethod::StorePickup => self.store_pickup,
        }
    }
}

impl Default for ShippingRateTable {
    /// Standard ₹100 (free from ₹1000 net), Express ₹250, pickup free.
    fn default() -> Self {
        ShippingRateTable {
            standard: ShippingRate {
                fee: Money::from_minor(10_000),
                free_above: Some(Money::from_minor(100_000)),
            },
            express: ShippingRate {
                fee: Money::from_minor(25_000),
                free_above: None,
            },
            store_pickup: ShippingRate {
                fee: Money::zero(),
                free_above: None,
            },
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Store-wide pricing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub tax_rate: TaxRate,
    pub shipping: ShippingRateTable,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            tax_rate: TaxRate::from_bps(DEFAULT_TAX_RATE_BPS),
            shipping: ShippingRateTable::default(),
        }
    }
}

/// What the summary is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PricingMode {
    /// Cart page display: an empty cart prices to all zeros.
    Preview,
    /// Order placement: an empty cart is an error.
    Checkout,
}

// =============================================================================
// Price Summary
// =============================================================================

/// Result of pricing a cart.
///
/// `total == subtotal - discount + shipping_fee + tax` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceSummary {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub total: Money,
    /// Σ quantity across lines.
    pub item_count: u64,
}

impl PriceSummary {
    pub const fn zero() -> Self {
        PriceSummary {
            subtotal: Money::zero(),
            discount: Money::zero(),
            shipping_fee: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            item_count: 0,
        }
    }

    /// `subtotal - discount`, the amount tax and free shipping are based on.
    pub fn net_subtotal(&self) -> Money {
        self.subtotal - self.discount
    }

    /// Whether this summary was computed from exactly these lines.
    pub fn reconciles(&self, cart: &Cart) -> bool {
        self.subtotal == cart.subtotal()
            && self.item_count == cart.total_quantity()
            && self.total
                == (self.net_subtotal() + self.shipping_fee + self.tax).clamp_non_negative()
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        PricingEngine { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Prices a cart.
    ///
    /// ## Arguments
    /// * `coupon` - the coupon fetched for `cart.coupon_code()`, if any. A
    ///   coupon whose code differs from the cart's, or any coupon for a cart
    ///   that names none, is rejected with `CodeMismatch`.
    /// * `mode` - `Preview` tolerates an empty cart, `Checkout` does not.
    /// * `now` - evaluation time for the coupon window.
    ///
    /// ## Errors
    /// * `EmptyCart` - checkout of a cart with no lines
    /// * `InvalidCoupon` - the first coupon rule that failed
    pub fn compute_summary(
        &self,
        cart: &Cart,
        coupon: Option<&Coupon>,
        shipping: ShippingMethod,
        mode: PricingMode,
        now: DateTime<Utc>,
    ) -> PricingResult<PriceSummary> {
        if cart.is_empty() {
            return match mode {
                PricingMode::Preview => Ok(PriceSummary::zero()),
                PricingMode::Checkout => Err(PricingError::EmptyCart),
            };
        }

        let subtotal = cart.subtotal();

        let discount = match coupon {
            Some(coupon) => {
                let named = cart.coupon_code();
                if !named.is_some_and(|code| coupon.matches_code(code)) {
                    return Err(PricingError::invalid_coupon(
                        named.unwrap_or(coupon.code.as_str()),
                        CouponRejection::CodeMismatch,
                    ));
                }
                coupon
                    .validate(subtotal, now)
                    .map_err(|reason| PricingError::invalid_coupon(&coupon.code, reason))?;
                coupon.discount_for(subtotal)
            }
            None => Money::zero(),
        };

        let net = subtotal - discount;
        let shipping_fee = self.config.shipping.rate(shipping).fee_for(net);
        let tax = net.apply_rate(self.config.tax_rate);

        let mut total = net + shipping_fee + tax;
        if total.is_negative() {
            tracing::error!(
                subtotal = subtotal.minor(),
                discount = discount.minor(),
                total = total.minor(),
                "Negative order total computed; clamping to zero"
            );
            total = Money::zero();
        }

        Ok(PriceSummary {
            subtotal,
            discount,
            shipping_fee,
            tax,
            total,
            item_count: cart.total_quantity(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LineItem;
    use crate::coupon::CouponKind;
    use chrono::Duration;

    fn line(id: &str, price: i64, qty: u32) -> LineItem {
        LineItem::new(id, id, Money::from_minor(price), qty, None).unwrap()
    }

    fn coupon(code: &str, kind: CouponKind) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: code.to_string(),
            kind,
            min_order_amount: Money::zero(),
            valid_from: now - Duration::days(7),
            valid_to: now + Duration::days(7),
            usage_limit: None,
            used_count: 0,
        }
    }

    fn engine() -> PricingEngine {
        PricingEngine::default()
    }

    #[test]
    fn test_worked_example() {
        let mut cart = Cart::new();
        cart.add_item(line("kurta", 50_000, 2)).unwrap();
        cart.add_item(line("mug", 30_000, 1)).unwrap();
        cart.apply_coupon("SAVE10").unwrap();
        let save10 = coupon(
            "SAVE10",
            CouponKind::Percentage {
                percent: 10,
                max_discount: Some(Money::from_minor(10_000)),
            },
        );

        let summary = engine()
            .compute_summary(
                &cart,
                Some(&save10),
                ShippingMethod::Standard,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap();

        assert_eq!(summary.subtotal.minor(), 130_000);
        assert_eq!(summary.discount.minor(), 10_000);
        assert_eq!(summary.shipping_fee.minor(), 0);
        assert_eq!(summary.tax.minor(), 21_600);
        assert_eq!(summary.total.minor(), 141_600);
        assert_eq!(summary.item_count, 3);
        assert!(summary.reconciles(&cart));
    }

    #[test]
    fn test_free_shipping_uses_discounted_subtotal() {
        let mut cart = Cart::new();
        cart.add_item(line("lamp", 120_000, 1)).unwrap();
        cart.apply_coupon("FLAT300").unwrap();
        let flat = coupon(
            "FLAT300",
            CouponKind::FixedAmount {
                amount: Money::from_minor(30_000),
            },
        );

        let summary = engine()
            .compute_summary(
                &cart,
                Some(&flat),
                ShippingMethod::Standard,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap();

        // 1200 - 300 = 900 < 1000: shipping is charged
        assert_eq!(summary.discount.minor(), 30_000);
        assert_eq!(summary.shipping_fee.minor(), 10_000);
        assert_eq!(summary.tax.minor(), 16_200);
        assert_eq!(summary.total.minor(), 90_000 + 10_000 + 16_200);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut cart = Cart::new();
        cart.add_item(line("lamp", 100_000, 1)).unwrap();

        let summary = engine()
            .compute_summary(
                &cart,
                None,
                ShippingMethod::Standard,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap();

        assert!(summary.shipping_fee.is_zero());
    }

    #[test]
    fn test_express_never_free_and_pickup_zero() {
        let mut cart = Cart::new();
        cart.add_item(line("lamp", 500_000, 1)).unwrap();
        let now = Utc::now();

        let express = engine()
            .compute_summary(&cart, None, ShippingMethod::Express, PricingMode::Checkout, now)
            .unwrap();
        let pickup = engine()
            .compute_summary(&cart, None, ShippingMethod::StorePickup, PricingMode::Checkout, now)
            .unwrap();

        assert_eq!(express.shipping_fee.minor(), 25_000);
        assert!(pickup.shipping_fee.is_zero());
        // Tax excludes shipping
        assert_eq!(express.tax, pickup.tax);
    }

    #[test]
    fn test_empty_cart_by_mode() {
        let cart = Cart::new();
        let now = Utc::now();

        let preview = engine()
            .compute_summary(&cart, None, ShippingMethod::Standard, PricingMode::Preview, now)
            .unwrap();
        assert_eq!(preview, PriceSummary::zero());

        let err = engine()
            .compute_summary(&cart, None, ShippingMethod::Standard, PricingMode::Checkout, now)
            .unwrap_err();
        assert_eq!(err, PricingError::EmptyCart);
    }

    #[test]
    fn test_invalid_coupon_leaves_cart_untouched() {
        let mut cart = Cart::new();
        cart.add_item(line("mug", 30_000, 1)).unwrap();
        cart.apply_coupon("BIGSPEND").unwrap();
        let before = cart.clone();

        let mut big = coupon(
            "BIGSPEND",
            CouponKind::FixedAmount {
                amount: Money::from_minor(5_000),
            },
        );
        big.min_order_amount = Money::from_minor(200_000);

        let err = engine()
            .compute_summary(
                &cart,
                Some(&big),
                ShippingMethod::Standard,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(
            err,
            PricingError::invalid_coupon("BIGSPEND", CouponRejection::BelowMinimumOrder)
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_coupon_code_mismatch() {
        let mut cart = Cart::new();
        cart.add_item(line("mug", 30_000, 1)).unwrap();
        cart.apply_coupon("SAVE10").unwrap();
        let other = coupon(
            "OTHER",
            CouponKind::FixedAmount {
                amount: Money::from_minor(100),
            },
        );

        let err = engine()
            .compute_summary(
                &cart,
                Some(&other),
                ShippingMethod::Standard,
                PricingMode::Preview,
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            PricingError::InvalidCoupon {
                reason: CouponRejection::CodeMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_coupon_without_cart_code_is_rejected() {
        let mut cart = Cart::new();
        cart.add_item(line("mug", 30_000, 1)).unwrap();
        let stray = coupon(
            "SAVE10",
            CouponKind::FixedAmount {
                amount: Money::from_minor(100),
            },
        );

        let err = engine()
            .compute_summary(
                &cart,
                Some(&stray),
                ShippingMethod::Standard,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(
            err,
            PricingError::invalid_coupon("SAVE10", CouponRejection::CodeMismatch)
        );
    }

    #[test]
    fn test_fixed_discount_covers_whole_subtotal() {
        let mut cart = Cart::new();
        cart.add_item(line("sticker", 5_000, 1)).unwrap();
        cart.apply_coupon("FREEBIE").unwrap();
        let freebie = coupon(
            "FREEBIE",
            CouponKind::FixedAmount {
                amount: Money::from_minor(50_000),
            },
        );

        let summary = engine()
            .compute_summary(
                &cart,
                Some(&freebie),
                ShippingMethod::StorePickup,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap();

        assert_eq!(summary.discount.minor(), 5_000);
        assert!(summary.tax.is_zero());
        assert!(summary.total.is_zero());
    }

    #[test]
    fn test_deterministic() {
        let mut cart = Cart::new();
        cart.add_item(line("kurta", 49_999, 3)).unwrap();
        let now = Utc::now();

        let a = engine()
            .compute_summary(&cart, None, ShippingMethod::Express, PricingMode::Checkout, now)
            .unwrap();
        let b = engine()
            .compute_summary(&cart, None, ShippingMethod::Express, PricingMode::Checkout, now)
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_tax_rate() {
        let mut config = PricingConfig::default();
        config.tax_rate = TaxRate::from_bps(500);
        let engine = PricingEngine::new(config);

        let mut cart = Cart::new();
        cart.add_item(line("book", 39_900, 1)).unwrap();

        let summary = engine
            .compute_summary(
                &cart,
                None,
                ShippingMethod::StorePickup,
                PricingMode::Checkout,
                Utc::now(),
            )
            .unwrap();

        // 5% of 39_900 = 1_995
        assert_eq!(summary.tax.minor(), 1_995);
    }
}
