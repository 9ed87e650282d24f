//! # Order Lifecycle
//!
//! The order state machine: creates orders from priced carts and applies
//! transition requests, returning the new order plus the side effects the
//! caller must carry out.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TransitionRequest { event, actor, note, at }                           │
//! │        │                                                                │
//! │        ├── state already a target of event?  yes ──► Ok (no-op)         │
//! │        ├── terminal state?                   yes ──► TerminalState      │
//! │        ├── (state, event) in table?          no  ──► InvalidTransition  │
//! │        ├── actor permitted (and owner)?      no  ──► Unauthorized       │
//! │        ├── retry cap reached?                yes ──► RetryLimitExceeded │
//! │        ▼                                                                │
//! │  clone order, set state, bump version, append history                   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Transition { order, effects: [CapturePayment, Inventory.., Notify] }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects Are Declared, Not Performed
//! Nothing here talks to payment, inventory or notification systems. The
//! caller persists the new order first and then executes the effects.
//!
//! ## Two Cancellation Paths
//! - `Cancel` before `Processing`: stock was at most held, so each line gets
//!   `ReleaseInventory` (plus `RefundPayment` if money was captured)
//! - `CancelWithRefund` from `Processing`/`Shipped`: stock is committed, so
//!   each line gets `Restock` and the full total is refunded

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Cart, LineItem};
use crate::error::{LifecycleError, LifecycleResult};
use crate::money::Money;
use crate::order::{EventKind, HistoryEntry, Order, OrderEvent, OrderState, PaymentState};
use crate::pricing::PriceSummary;
use crate::types::{Actor, ActorRole, PaymentMethod, ShippingAddress, ShippingMethod};
use crate::validation::{validate_address, validate_tracking_id};
use crate::DEFAULT_MAX_PAYMENT_RETRIES;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleConfig {
    /// How many RetryPayment transitions an order may take.
    pub max_payment_retries: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            max_payment_retries: DEFAULT_MAX_PAYMENT_RETRIES,
        }
    }
}

// =============================================================================
// Effects
// =============================================================================

/// Inventory key and quantity for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryLine {
    pub product_id: String,
    pub variant_key: Option<String>,
    pub quantity: u32,
}

impl From<&LineItem> for InventoryLine {
    fn from(item: &LineItem) -> Self {
        InventoryLine {
            product_id: item.product_id.clone(),
            variant_key: item.variant_key.clone(),
            quantity: item.quantity,
        }
    }
}

/// Work a collaborator must do after a transition is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum Effect {
    CapturePayment {
        #[ts(as = "String")]
        order_id: Uuid,
        amount: Money,
        method: PaymentMethod,
    },
    DecrementInventory {
        #[ts(as = "String")]
        order_id: Uuid,
        line: InventoryLine,
    },
    ReleaseInventory {
        #[ts(as = "String")]
        order_id: Uuid,
        line: InventoryLine,
    },
    Restock {
        #[ts(as = "String")]
        order_id: Uuid,
        line: InventoryLine,
    },
    RefundPayment {
        #[ts(as = "String")]
        order_id: Uuid,
        amount: Money,
    },
    Notify {
        #[ts(as = "String")]
        order_id: Uuid,
        state: OrderState,
    },
}

// =============================================================================
// Requests and Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub event: OrderEvent,
    pub actor: Actor,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl TransitionRequest {
    pub fn new(event: OrderEvent, actor: Actor, at: DateTime<Utc>) -> Self {
        TransitionRequest {
            event,
            actor,
            note: None,
            at,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Outcome of an accepted (or idempotently replayed) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub order: Order,
    pub effects: Vec<Effect>,
    /// `false` when the request was a replay and nothing changed.
    pub applied: bool,
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: String,
    pub cart: Cart,
    pub summary: PriceSummary,
    pub shipping_method: ShippingMethod,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

// =============================================================================
// Transition Table
// =============================================================================

/// The static `(state, event) → next` table.
pub fn next_state(from: OrderState, event: EventKind) -> Option<OrderState> {
    use EventKind as E;
    use OrderState as S;

    match (from, event) {
        (S::Created, E::SubmitPayment) => Some(S::PaymentPending),
        (S::PaymentPending, E::ConfirmPayment) => Some(S::PaymentConfirmed),
        (S::PaymentPending, E::FailPayment) => Some(S::PaymentFailed),
        (S::PaymentFailed, E::RetryPayment) => Some(S::PaymentPending),
        (S::PaymentConfirmed, E::StartProcessing) => Some(S::Processing),
        (S::Processing, E::Ship) => Some(S::Shipped),
        (S::Shipped, E::MarkOutForDelivery) => Some(S::OutForDelivery),
        (S::OutForDelivery, E::MarkDelivered) => Some(S::Delivered),
        (S::Created | S::PaymentPending | S::PaymentConfirmed, E::Cancel) => Some(S::Cancelled),
        (S::Processing | S::Shipped, E::CancelWithRefund) => Some(S::Cancelled),
        _ => None,
    }
}

/// Whether `state` is where `event` leads from somewhere.
fn is_target_of(state: OrderState, event: EventKind) -> bool {
    OrderState::ALL
        .into_iter()
        .any(|from| next_state(from, event) == Some(state))
}

/// Role and ownership check for `actor` requesting `event` on `order`.
fn authorize(order: &Order, actor: &Actor, event: EventKind) -> LifecycleResult<()> {
    let role = actor.role;
    let owns = role != ActorRole::Customer || order.is_owned_by(&actor.id);
    if !owns || !role_may_request(role, event) {
        return Err(LifecycleError::Unauthorized { role, event });
    }
    Ok(())
}

/// Role permissions. Customers additionally have to own the order.
fn role_may_request(role: ActorRole, event: EventKind) -> bool {
    match role {
        ActorRole::Admin => true,
        ActorRole::System => event != EventKind::CancelWithRefund,
        ActorRole::Customer => matches!(
            event,
            EventKind::SubmitPayment | EventKind::RetryPayment | EventKind::Cancel
        ),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// The state machine. Holds only configuration; safe to share across tasks.
#[derive(Debug, Clone, Default)]
pub struct OrderLifecycle {
    config: LifecycleConfig,
}

impl OrderLifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        OrderLifecycle { config }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Places an order from a priced cart.
    ///
    /// Lines and prices are frozen; later catalog changes do not affect the
    /// order. The order starts `Created` at version 1 with one history entry.
    ///
    /// ## Errors
    /// * `InvalidOrder` - empty cart, or a summary that does not match the cart
    /// * `Validation` - malformed shipping address
    pub fn create_order(&self, new: NewOrder) -> LifecycleResult<Transition> {
        if new.cart.is_empty() {
            return Err(LifecycleError::InvalidOrder {
                reason: "cart is empty".to_string(),
            });
        }
        if !new.summary.reconciles(&new.cart) {
            return Err(LifecycleError::InvalidOrder {
                reason: "price summary does not match cart lines".to_string(),
            });
        }
        validate_address(&new.shipping_address)?;

        let order = Order {
            id: new.id,
            customer_id: new.customer_id,
            line_items: new.cart.items().to_vec(),
            price_summary: new.summary,
            coupon_code: new.cart.coupon_code().map(str::to_string),
            shipping_method: new.shipping_method,
            shipping_address: new.shipping_address,
            payment_method: new.payment_method,
            state: OrderState::Created,
            payment_state: PaymentState::Unpaid,
            tracking_id: None,
            payment_retries: 0,
            version: 1,
            history: vec![HistoryEntry {
                from: None,
                to: OrderState::Created,
                event: EventKind::Create,
                at: new.at,
                actor: new.actor,
                note: None,
            }],
            created_at: new.at,
            updated_at: new.at,
        };

        let effects = vec![Effect::Notify {
            order_id: order.id,
            state: OrderState::Created,
        }];

        Ok(Transition {
            order,
            effects,
            applied: true,
        })
    }

    /// Applies one request to an order.
    ///
    /// The input order is never modified. On success the returned order is a
    /// new value with `version + 1`; a replayed request returns an identical
    /// copy with no effects.
    pub fn apply_transition(
        &self,
        order: &Order,
        request: TransitionRequest,
    ) -> LifecycleResult<Transition> {
        let kind = request.event.kind();
        let from = order.state;

        // A replay must be one the actor could have made, carrying the same
        // payload as the accepted event.
        if is_target_of(from, kind) {
            authorize(order, &request.actor, kind)?;
            if let OrderEvent::Ship { tracking_id } = &request.event {
                if order.tracking_id.as_deref() != Some(tracking_id.trim()) {
                    return Err(LifecycleError::InvalidTransition { from, event: kind });
                }
            }
            return Ok(Transition {
                order: order.clone(),
                effects: Vec::new(),
                applied: false,
            });
        }

        if from.is_terminal() {
            return Err(LifecycleError::TerminalState {
                order_id: order.id.to_string(),
                state: from,
            });
        }

        let to = next_state(from, kind)
            .ok_or(LifecycleError::InvalidTransition { from, event: kind })?;

        authorize(order, &request.actor, kind)?;

        if kind == EventKind::RetryPayment
            && order.payment_retries >= self.config.max_payment_retries
        {
            return Err(LifecycleError::RetryLimitExceeded {
                limit: self.config.max_payment_retries,
            });
        }

        let mut next = order.clone();
        let mut effects = Vec::new();

        match &request.event {
            OrderEvent::SubmitPayment | OrderEvent::RetryPayment => {
                if kind == EventKind::RetryPayment {
                    next.payment_retries += 1;
                }
                next.payment_state = PaymentState::Pending;
                effects.push(Effect::CapturePayment {
                    order_id: order.id,
                    amount: order.total(),
                    method: order.payment_method,
                });
            }
            OrderEvent::ConfirmPayment => {
                next.payment_state = PaymentState::Captured;
                effects.extend(order.line_items.iter().map(|item| Effect::DecrementInventory {
                    order_id: order.id,
                    line: item.into(),
                }));
            }
            OrderEvent::FailPayment => {
                next.payment_state = PaymentState::Failed;
            }
            OrderEvent::Ship { tracking_id } => {
                validate_tracking_id(tracking_id)?;
                next.tracking_id = Some(tracking_id.trim().to_string());
            }
            OrderEvent::Cancel => {
                effects.extend(order.line_items.iter().map(|item| Effect::ReleaseInventory {
                    order_id: order.id,
                    line: item.into(),
                }));
                next.payment_state = match order.payment_state {
                    PaymentState::Captured => {
                        effects.push(Effect::RefundPayment {
                            order_id: order.id,
                            amount: order.total(),
                        });
                        PaymentState::Refunded
                    }
                    PaymentState::Pending => PaymentState::Voided,
                    other => other,
                };
            }
            OrderEvent::CancelWithRefund => {
                effects.extend(order.line_items.iter().map(|item| Effect::Restock {
                    order_id: order.id,
                    line: item.into(),
                }));
                effects.push(Effect::RefundPayment {
                    order_id: order.id,
                    amount: order.total(),
                });
                next.payment_state = PaymentState::Refunded;
            }
            OrderEvent::StartProcessing
            | OrderEvent::MarkOutForDelivery
            | OrderEvent::MarkDelivered => {}
        }

        next.state = to;
        next.version += 1;
        next.updated_at = request.at;
        next.history.push(HistoryEntry {
            from: Some(from),
            to,
            event: kind,
            at: request.at,
            actor: request.actor,
            note: request.note,
        });

        effects.push(Effect::Notify {
            order_id: order.id,
            state: to,
        });

        Ok(Transition {
            order: next,
            effects,
            applied: true,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
