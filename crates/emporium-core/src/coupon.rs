//! # Coupons
//!
//! Coupon snapshots and the rules that decide whether one applies.
//!
//! ## Validation Order
//! ```text
//! Coupon + subtotal + now
//!      │
//!      ├── valid_from <= now <= valid_to ?   no ──► NotYetValid / Expired
//!      ├── used_count < usage_limit ?        no ──► UsageExhausted
//!      ├── subtotal >= min_order_amount ?    no ──► BelowMinimumOrder
//!      ▼
//!   discount_for(subtotal)
//! ```
//!
//! A `Coupon` is a read-only snapshot taken from the coupon store. Nothing in
//! this module changes `used_count`; the store increments it after an order
//! is placed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CouponRejection, ValidationError};
use crate::money::Money;
use crate::validation::{validate_coupon_code, ValidationResult};

// =============================================================================
// Coupon Kind
// =============================================================================

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum CouponKind {
    /// `percent`% off the subtotal, optionally capped.
    Percentage {
        percent: u32,
        #[serde(rename = "maxDiscount", default)]
        max_discount: Option<Money>,
    },
    /// A flat amount off, never more than the subtotal.
    FixedAmount { amount: Money },
}

// =============================================================================
// Coupon
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Coupon {
    /// Upper-case code, e.g. `DIWALI10`.
    pub code: String,
    pub kind: CouponKind,
    /// Minimum subtotal required. Zero means no minimum.
    pub min_order_amount: Money,
    #[ts(as = "String")]
    pub valid_from: DateTime<Utc>,
    #[ts(as = "String")]
    pub valid_to: DateTime<Utc>,
    /// `None` means unlimited redemptions.
    pub usage_limit: Option<u32>,
    pub used_count: u32,
}

impl Coupon {
    /// Checks the coupon against a subtotal at a point in time.
    ///
    /// Returns the first failing rule, in the order shown in the module docs.
    pub fn validate(&self, subtotal: Money, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if now < self.valid_from {
            return Err(CouponRejection::NotYetValid);
        }
        if now > self.valid_to {
            return Err(CouponRejection::Expired);
        }

        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return Err(CouponRejection::UsageExhausted);
            }
        }

        if subtotal < self.min_order_amount {
            return Err(CouponRejection::BelowMinimumOrder);
        }

        Ok(())
    }

    /// Discount this coupon grants on `subtotal`.
    ///
    /// Percentages round down; the result never exceeds the subtotal.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let subtotal = subtotal.clamp_non_negative();
        let discount = match self.kind {
            CouponKind::Percentage {
                percent,
                max_discount,
            } => {
                let raw = subtotal.percentage_floor(percent);
                match max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            CouponKind::FixedAmount { amount } => amount,
        };
        discount.clamp_non_negative().min(subtotal)
    }

    /// Case-insensitive code comparison.
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// Structural checks for a coupon about to be stored.
    pub fn check_definition(&self) -> ValidationResult<()> {
        validate_coupon_code(&self.code)?;

        match self.kind {
            CouponKind::Percentage { percent, .. } if percent == 0 || percent > 100 => {
                return Err(ValidationError::OutOfRange {
                    field: "percent".to_string(),
                    min: 1,
                    max: 100,
                });
            }
            CouponKind::FixedAmount { amount } if !amount.is_positive() => {
                return Err(ValidationError::MustBePositive {
                    field: "amount".to_string(),
                });
            }
            _ => {}
        }

        if self.valid_to < self.valid_from {
            return Err(ValidationError::InvalidFormat {
                field: "valid_to".to_string(),
                reason: "must not be before valid_from".to_string(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
