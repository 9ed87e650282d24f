//! Order reads and transitions.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use emporium_core::{Actor, LifecycleError, Order, OrderEvent, Transition, TransitionRequest};

use super::{EventRequest, Storefront};
use crate::error::{ApiError, ApiResult};
use crate::locks::OrderGuard;

/// Page size cap for order listings.
pub const MAX_ORDER_PAGE: u32 = 100;

impl Storefront {
    pub async fn get_order(&self, id: Uuid) -> ApiResult<Order> {
        self.db
            .orders()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", &id.to_string()))
    }

    /// Most recent orders of one customer.
    pub async fn customer_orders(&self, customer_id: &str, limit: u32) -> ApiResult<Vec<Order>> {
        let limit = limit.clamp(1, MAX_ORDER_PAGE);
        Ok(self.db.orders().list_by_customer(customer_id, limit).await?)
    }

    /// Applies an event to an order and runs the effects it declares.
    ///
    /// Returns the order as it stands after all follow-up transitions (for
    /// example an immediate gateway approval after `SubmitPayment`).
    pub async fn apply_event(&self, id: Uuid, request: EventRequest) -> ApiResult<Order> {
        let guard = self.locks.lock(id).await;
        let transition = self
            .transition(&guard, id, request.event, request.actor, request.note)
            .await?;
        let follow_ups = self.dispatch(&transition.effects).await;

        Ok(self.follow_up(&guard, id, transition.order, follow_ups).await)
    }

    /// Load → apply → save. The caller holds the order's lock and runs the
    /// returned effects before releasing it, so effects of one order never
    /// interleave.
    ///
    /// A lost optimistic version check (another process saved first) re-reads
    /// the order and reapplies the event, up to `max_conflict_retries` times.
    pub(crate) async fn transition(
        &self,
        _guard: &OrderGuard,
        id: Uuid,
        event: OrderEvent,
        actor: Actor,
        note: Option<String>,
    ) -> ApiResult<Transition> {
        let mut conflicts = 0;

        loop {
            let order = self.get_order(id).await?;
            let request = TransitionRequest {
                event: event.clone(),
                actor: actor.clone(),
                note: note.clone(),
                at: Utc::now(),
            };

            let transition = match self.lifecycle.apply_transition(&order, request) {
                Ok(t) => t,
                Err(e) => {
                    debug!(order_id = %id, error = %e, "Transition rejected");
                    return Err(e.into());
                }
            };

            if !transition.applied {
                debug!(order_id = %id, event = %event.kind(), "Replayed event ignored");
                return Ok(transition);
            }

            match self.db.orders().update(&transition.order, order.version()).await {
                Ok(()) => {
                    info!(
                        order_id = %id,
                        from = %order.state(),
                        to = %transition.order.state(),
                        version = transition.order.version(),
                        actor = %actor.role,
                        "Order transitioned"
                    );
                    return Ok(transition);
                }
                Err(e) if e.is_conflict() && conflicts < self.max_conflict_retries => {
                    conflicts += 1;
                    warn!(order_id = %id, attempt = conflicts, "Version conflict, reapplying");
                }
                Err(e) if e.is_conflict() => {
                    return Err(LifecycleError::ConcurrentModification {
                        order_id: id.to_string(),
                        expected_version: order.version(),
                    }
                    .into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
