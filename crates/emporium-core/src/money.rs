//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A storefront that prices in rupees as floats drifts by a paisa here    │
//! │  and there, and checkout totals stop reconciling with line items.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paise)                              │
//! │    ₹12.34 is stored as 1234. Every rounding step is explicit.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use emporium_core::money::Money;
//!
//! let price = Money::from_minor(49_900); // ₹499.00
//! let line = price * 2;
//! assert_eq!(line.minor(), 99_800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and intermediate differences can be negative
/// - **Single field tuple struct**: zero-cost wrapper over i64
/// - **No float constructor**: there is deliberately no `from_f64`
///
/// ## Where Money Flows
/// ```text
/// Product.unit_price ──► LineItem.unit_price ──► LineItem::line_total()
///                                                      │
///                                                      ▼
///                          PriceSummary { subtotal, discount, shipping, tax, total }
///                                                      │
///                                                      ▼
///                                 Order.price_summary (frozen) ──► CapturePayment
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use emporium_core::money::Money;
    ///
    /// let fee = Money::from_minor(10_000); // ₹100.00
    /// assert_eq!(fee.minor(), 10_000);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from major and minor units (rupees and paise).
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -₹5.50.
    ///
    /// ```rust
    /// use emporium_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(12, 34).minor(), 1234);
    /// assert_eq!(Money::from_major_minor(-5, 50).minor(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the amount in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole major units (rupees), truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor part (0-99, always non-negative).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns zero for negative amounts, the amount otherwise.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// ```rust
    /// use emporium_core::money::Money;
    ///
    /// let unit = Money::from_minor(29_900);
    /// assert_eq!(unit.multiply_quantity(3).minor(), 89_700);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
    }

    /// Takes a whole-number percentage of the amount, rounded DOWN to the
    /// minor unit.
    ///
    /// Discounts round down so the customer is never promised more than the
    /// coupon allows.
    ///
    /// ```rust
    /// use emporium_core::money::Money;
    ///
    /// // 15% of ₹9.99 = 149.85 paise → 149 paise
    /// assert_eq!(Money::from_minor(999).percentage_floor(15).minor(), 149);
    /// ```
    pub fn percentage_floor(&self, percent: u32) -> Money {
        let part = (self.0 as i128 * percent as i128).div_euclid(100);
        Money(part as i64)
    }

    /// Applies a basis-point rate with half-up rounding.
    ///
    /// ## Implementation
    /// Integer math only: `(amount * bps + 5000) / 10000`, with an i128
    /// intermediate so large carts cannot overflow.
    ///
    /// ```rust
    /// use emporium_core::money::Money;
    /// use emporium_core::types::TaxRate;
    ///
    /// let net = Money::from_minor(120_000); // ₹1,200.00
    /// let tax = net.apply_rate(TaxRate::from_bps(1800)); // 18%
    /// assert_eq!(tax.minor(), 21_600);
    /// ```
    pub fn apply_rate(&self, rate: TaxRate) -> Money {
        let scaled = self.0 as i128 * rate.bps() as i128 + 5000;
        Money(scaled.div_euclid(10_000) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented rendering (`₹1416.00`, no digit grouping).
///
/// Storefront formatting (grouping, locale) belongs to the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(141_600).to_string(), "₹1416.00");
        assert_eq!(Money::from_minor(5).to_string(), "₹0.05");
        assert_eq!(Money::from_minor(-550).to_string(), "-₹5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(300);

        assert_eq!((a + b).minor(), 1300);
        assert_eq!((a - b).minor(), 700);
        assert_eq!((a * 3).minor(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.minor(), 1600);
    }

    #[test]
    fn test_percentage_floor_rounds_down() {
        assert_eq!(Money::from_minor(130_000).percentage_floor(10).minor(), 13_000);
        // 33% of 1001 = 330.33 → 330
        assert_eq!(Money::from_minor(1001).percentage_floor(33).minor(), 330);
        // 99.99 → 99
        assert_eq!(Money::from_minor(10_101).percentage_floor(99).minor(), 9999);
    }

    #[test]
    fn test_apply_rate_half_up() {
        // 18% of 1.25 = 0.225 → 0.23 (22.5 paise rounds up)
        assert_eq!(Money::from_minor(125).apply_rate(TaxRate::from_bps(1800)).minor(), 23);
        // 18% of 1.24 = 22.32 paise → 22
        assert_eq!(Money::from_minor(124).apply_rate(TaxRate::from_bps(1800)).minor(), 22);
        assert!(Money::from_minor(5000).apply_rate(TaxRate::zero()).is_zero());
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_minor(-1).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_minor(42).clamp_non_negative().minor(), 42);
    }
}
