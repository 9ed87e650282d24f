//! # Orders
//!
//! The order record, its states, and the events that move it.
//!
//! ## State Diagram
//! ```text
//!   Created ──SubmitPayment──► PaymentPending ──ConfirmPayment──► PaymentConfirmed
//!      │                        │    ▲     │                           │
//!      │             FailPayment│    │     │                    StartProcessing
//!      │                        ▼    │     │                           ▼
//!      │                  PaymentFailed    │                       Processing ──Ship──► Shipped
//!      │                   RetryPayment    │                           │                 │
//!      │                  (capped)         │                           │        MarkOutForDelivery
//!      │                                   │                           │                 ▼
//!      │ Cancel                     Cancel │     Cancel (from          │          OutForDelivery
//!      ▼                                   ▼     PaymentConfirmed)     │                 │
//!   ┌──────────────────────────────────────────┐                       │           MarkDelivered
//!   │                Cancelled                 │◄── CancelWithRefund ──┘ (admin,         ▼
//!   └──────────────────────────────────────────┘    also from Shipped)               Delivered
//! ```
//!
//! `Delivered` and `Cancelled` are terminal. Orders are never deleted.
//!
//! All mutation goes through [`crate::lifecycle::OrderLifecycle`]; the
//! fields here are readable by anyone but writable only inside the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::LineItem;
use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::PriceSummary;
use crate::types::{Actor, PaymentMethod, ShippingAddress, ShippingMethod};

// =============================================================================
// Order State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderState {
    Created,
    PaymentPending,
    PaymentFailed,
    PaymentConfirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderState {
    pub const ALL: [OrderState; 9] = [
        OrderState::Created,
        OrderState::PaymentPending,
        OrderState::PaymentFailed,
        OrderState::PaymentConfirmed,
        OrderState::Processing,
        OrderState::Shipped,
        OrderState::OutForDelivery,
        OrderState::Delivered,
        OrderState::Cancelled,
    ];

    /// No event leaves a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderState::Created => "created",
            OrderState::PaymentPending => "payment_pending",
            OrderState::PaymentFailed => "payment_failed",
            OrderState::PaymentConfirmed => "payment_confirmed",
            OrderState::Processing => "processing",
            OrderState::Shipped => "shipped",
            OrderState::OutForDelivery => "out_for_delivery",
            OrderState::Delivered => "delivered",
            OrderState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "state".to_string(),
                value: s.to_string(),
            })
    }
}

// =============================================================================
// Payment State
// =============================================================================

/// Where the money is, independent of fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentState {
    #[default]
    Unpaid,
    /// Capture requested, outcome not known yet.
    Pending,
    Captured,
    Failed,
    /// Cancelled while a capture was pending.
    Voided,
    Refunded,
}

impl PaymentState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Unpaid => "unpaid",
            PaymentState::Pending => "pending",
            PaymentState::Captured => "captured",
            PaymentState::Failed => "failed",
            PaymentState::Voided => "voided",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentState::Unpaid),
            "pending" => Ok(PaymentState::Pending),
            "captured" => Ok(PaymentState::Captured),
            "failed" => Ok(PaymentState::Failed),
            "voided" => Ok(PaymentState::Voided),
            "refunded" => Ok(PaymentState::Refunded),
            other => Err(ValidationError::NotAllowed {
                field: "payment_state".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// A request to move an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum OrderEvent {
    SubmitPayment,
    ConfirmPayment,
    FailPayment,
    RetryPayment,
    StartProcessing,
    Ship {
        #[serde(rename = "trackingId")]
        tracking_id: String,
    },
    MarkOutForDelivery,
    MarkDelivered,
    Cancel,
    CancelWithRefund,
}

impl OrderEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            OrderEvent::SubmitPayment => EventKind::SubmitPayment,
            OrderEvent::ConfirmPayment => EventKind::ConfirmPayment,
            OrderEvent::FailPayment => EventKind::FailPayment,
            OrderEvent::RetryPayment => EventKind::RetryPayment,
            OrderEvent::StartProcessing => EventKind::StartProcessing,
            OrderEvent::Ship { .. } => EventKind::Ship,
            OrderEvent::MarkOutForDelivery => EventKind::MarkOutForDelivery,
            OrderEvent::MarkDelivered => EventKind::MarkDelivered,
            OrderEvent::Cancel => EventKind::Cancel,
            OrderEvent::CancelWithRefund => EventKind::CancelWithRefund,
        }
    }
}

/// Payload-free event discriminant, used in history and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EventKind {
    /// Not a transition: the entry written when an order is placed.
    Create,
    SubmitPayment,
    ConfirmPayment,
    FailPayment,
    RetryPayment,
    StartProcessing,
    Ship,
    MarkOutForDelivery,
    MarkDelivered,
    Cancel,
    CancelWithRefund,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::SubmitPayment => "submit_payment",
            EventKind::ConfirmPayment => "confirm_payment",
            EventKind::FailPayment => "fail_payment",
            EventKind::RetryPayment => "retry_payment",
            EventKind::StartProcessing => "start_processing",
            EventKind::Ship => "ship",
            EventKind::MarkOutForDelivery => "mark_out_for_delivery",
            EventKind::MarkDelivered => "mark_delivered",
            EventKind::Cancel => "cancel",
            EventKind::CancelWithRefund => "cancel_with_refund",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KINDS: [EventKind; 11] = [
            EventKind::Create,
            EventKind::SubmitPayment,
            EventKind::ConfirmPayment,
            EventKind::FailPayment,
            EventKind::RetryPayment,
            EventKind::StartProcessing,
            EventKind::Ship,
            EventKind::MarkOutForDelivery,
            EventKind::MarkDelivered,
            EventKind::Cancel,
            EventKind::CancelWithRefund,
        ];
        KINDS
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "event".to_string(),
                value: s.to_string(),
            })
    }
}

// =============================================================================
// History
// =============================================================================

/// One accepted change. The first entry of every order has `from: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HistoryEntry {
    pub from: Option<OrderState>,
    pub to: OrderState,
    pub event: EventKind,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
    pub actor: Actor,
    pub note: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// A placed order with frozen lines and prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    #[ts(as = "String")]
    pub(crate) id: Uuid,
    pub(crate) customer_id: String,
    pub(crate) line_items: Vec<LineItem>,
    pub(crate) price_summary: PriceSummary,
    pub(crate) coupon_code: Option<String>,
    pub(crate) shipping_method: ShippingMethod,
    pub(crate) shipping_address: ShippingAddress,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) state: OrderState,
    pub(crate) payment_state: PaymentState,
    pub(crate) tracking_id: Option<String>,
    /// Number of RetryPayment transitions accepted so far.
    pub(crate) payment_retries: u32,
    /// Starts at 1, +1 per accepted transition.
    pub(crate) version: u64,
    pub(crate) history: Vec<HistoryEntry>,
    #[ts(as = "String")]
    pub(crate) created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Order {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn price_summary(&self) -> &PriceSummary {
        &self.price_summary
    }

    pub fn total(&self) -> Money {
        self.price_summary.total
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn shipping_method(&self) -> ShippingMethod {
        self.shipping_method
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn payment_state(&self) -> PaymentState {
        self.payment_state
    }

    pub fn tracking_id(&self) -> Option<&str> {
        self.tracking_id.as_deref()
    }

    pub fn payment_retries(&self) -> u32 {
        self.payment_retries
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether `actor_id` is the customer who placed the order.
    pub fn is_owned_by(&self, actor_id: &str) -> bool {
        self.customer_id == actor_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
