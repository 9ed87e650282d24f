//! # Domain Types
//!
//! Value types shared by the pricing engine and the order lifecycle.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ ShippingMethod  │   │ PaymentMethod   │       │
//! │  │  (catalog view) │   │  Standard       │   │  Card / Upi     │       │
//! │  │  id, name       │   │  Express        │   │  NetBanking     │       │
//! │  │  unit_price     │   │  StorePickup    │   │  Wallet / COD   │       │
//! │  │  stock_quantity │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ ShippingAddress │   │     Actor       │       │
//! │  │  bps (u32)      │   │  name, lines    │   │  id + role      │       │
//! │  │  1800 = 18%     │   │  city, pincode  │   │  Customer/Admin │       │
//! │  └─────────────────┘   └─────────────────┘   │  /System        │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 1800 bps = 18% (GST slab) and
/// fractional slabs like 2.5% (250 bps) stay exact integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        TaxRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product (catalog view)
// =============================================================================

/// The slice of a catalog product the checkout path consumes.
///
/// Catalog storage itself lives outside the core; this is only what
/// `get_product(id)` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Current list price. Copied into a line item when added to a cart.
    pub unit_price: Money,
    pub stock_quantity: i64,
}

impl Product {
    /// Checks whether `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Shipping method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    StorePickup,
}

impl ShippingMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
            ShippingMethod::StorePickup => "store_pickup",
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery address captured at checkout and frozen on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    /// Six-digit Indian PIN code.
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Card,
    Upi,
    NetBanking,
    Wallet,
    CashOnDelivery,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Role of whoever requests a lifecycle transition.
///
/// Authentication happens upstream; the core only sees the resolved role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ActorRole {
    /// The shopper who owns the order.
    Customer,
    /// Back-office staff working from the admin console.
    Admin,
    /// Automated callers: payment webhooks, carrier updates, workers.
    System,
}

impl ActorRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorRole {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(ActorRole::Customer),
            "admin" => Ok(ActorRole::Admin),
            "system" => Ok(ActorRole::System),
            other => Err(crate::error::ValidationError::NotAllowed {
                field: "role".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn customer(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            role: ActorRole::Customer,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            role: ActorRole::Admin,
        }
    }

    pub fn system(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            role: ActorRole::System,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
