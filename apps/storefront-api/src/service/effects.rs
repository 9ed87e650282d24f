//! # Effect Dispatch
//!
//! Executes the effects a transition declared, in declaration order.
//!
//! ```text
//!   Transition.effects
//!        │
//!        ├── CapturePayment ──► gateway ──► Approved ──► ConfirmPayment ─┐
//!        │                              ├─► Declined ──► FailPayment ────┤ follow-up
//!        │                              └─► Pending  ──► (webhook later) │ events
//!        ├── Decrement/Release/Restock ──► InventorySink                 │
//!        ├── RefundPayment ──► gateway                                   │
//!        └── Notify ──► Notifier                                         │
//!                                                                        ▼
//!                                   transition again as the gateway actor
//! ```
//!
//! Each collaborator call is retried with exponential backoff. An effect that
//! still fails is logged and skipped: the transition that declared it is
//! already saved, and the inventory ledger makes a later replay safe.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::collections::VecDeque;
use std::future::Future;
use tracing::{debug, error, warn};
use uuid::Uuid;

use emporium_core::{Actor, Effect, Order, OrderEvent, Transition};
use emporium_db::MovementKind;

use super::Storefront;
use crate::collaborators::{CaptureOutcome, CollaboratorResult};
use crate::locks::OrderGuard;

/// Actor id recorded on transitions driven by a gateway response.
pub const GATEWAY_ACTOR_ID: &str = "payment-gateway";

impl Storefront {
    /// Runs the effects of a freshly created order.
    pub(crate) async fn settle(&self, transition: Transition) -> Order {
        let id = transition.order.id();
        let guard = self.locks.lock(id).await;
        let follow_ups = self.dispatch(&transition.effects).await;

        self.follow_up(&guard, id, transition.order, follow_ups).await
    }

    /// Applies gateway-driven events one by one with their own effects.
    /// Stops at the first rejected event.
    ///
    /// Runs under the same guard as the transition whose effects produced
    /// `events`, so no other request sees the order between a capture and
    /// its outcome.
    pub(crate) async fn follow_up(
        &self,
        guard: &OrderGuard,
        id: Uuid,
        mut order: Order,
        events: Vec<OrderEvent>,
    ) -> Order {
        let mut pending: VecDeque<OrderEvent> = events.into();

        while let Some(event) = pending.pop_front() {
            let kind = event.kind();
            let result = self
                .transition(
                    guard,
                    id,
                    event,
                    Actor::system(GATEWAY_ACTOR_ID),
                    Some("payment gateway response".to_string()),
                )
                .await;

            match result {
                Ok(transition) => {
                    pending.extend(self.dispatch(&transition.effects).await);
                    order = transition.order;
                }
                Err(e) => {
                    warn!(order_id = %id, event = %kind, error = %e, "Follow-up event rejected");
                    break;
                }
            }
        }

        order
    }

    /// Executes effects in order and returns the follow-up events they
    /// produced.
    pub(crate) async fn dispatch(&self, effects: &[Effect]) -> Vec<OrderEvent> {
        let mut follow_ups = Vec::new();

        for effect in effects {
            match self.execute(effect).await {
                Ok(Some(event)) => follow_ups.push(event),
                Ok(None) => {}
                Err(e) => error!(
                    effect = effect_name(effect),
                    error = %e,
                    "Effect failed after retries"
                ),
            }
        }

        follow_ups
    }

    async fn execute(&self, effect: &Effect) -> CollaboratorResult<Option<OrderEvent>> {
        let c = &self.collaborators;
        let name = effect_name(effect);
        debug!(effect = name, "Dispatching effect");

        match effect {
            Effect::CapturePayment {
                order_id,
                amount,
                method,
            } => {
                let outcome = self
                    .with_retry(name, || c.payments.capture(*order_id, *amount, *method))
                    .await?;
                debug!(order_id = %order_id, ?outcome, "Capture answered");
                Ok(match outcome {
                    CaptureOutcome::Approved => Some(OrderEvent::ConfirmPayment),
                    CaptureOutcome::Declined => Some(OrderEvent::FailPayment),
                    CaptureOutcome::Pending => None,
                })
            }
            Effect::DecrementInventory { order_id, line } => {
                self.with_retry(name, || {
                    c.inventory.apply(*order_id, line, MovementKind::Decrement)
                })
                .await?;
                Ok(None)
            }
            Effect::ReleaseInventory { order_id, line } => {
                self.with_retry(name, || {
                    c.inventory.apply(*order_id, line, MovementKind::Release)
                })
                .await?;
                Ok(None)
            }
            Effect::Restock { order_id, line } => {
                self.with_retry(name, || {
                    c.inventory.apply(*order_id, line, MovementKind::Restock)
                })
                .await?;
                Ok(None)
            }
            Effect::RefundPayment { order_id, amount } => {
                self.with_retry(name, || c.payments.refund(*order_id, *amount)).await?;
                Ok(None)
            }
            Effect::Notify { order_id, state } => {
                c.notifier.notify(*order_id, *state).await;
                Ok(None)
            }
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        effect: &'static str,
        mut op: F,
    ) -> CollaboratorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CollaboratorResult<T>>,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.effects.initial_backoff(),
            max_interval: self.effects.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.effects.max_attempts => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.effects.max_backoff());
                    warn!(effect, attempt, ?delay, error = %e, "Effect failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn effect_name(effect: &Effect) -> &'static str {
    match effect {
        Effect::CapturePayment { .. } => "capture_payment",
        Effect::DecrementInventory { .. } => "decrement_inventory",
        Effect::ReleaseInventory { .. } => "release_inventory",
        Effect::Restock { .. } => "restock",
        Effect::RefundPayment { .. } => "refund_payment",
        Effect::Notify { .. } => "notify",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    use crate::collaborators::{CollaboratorError, Collaborators, Notifier, PaymentGateway};
    use crate::service::test_support::{checkout_request, config, db, event, storefront};
    use emporium_core::{Money, OrderState, PaymentMethod, PaymentState};

    #[tokio::test]
    async fn test_approved_capture_confirms_and_decrements() {
        let (store, _) = storefront(CaptureOutcome::Approved).await;
        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();

        let order = store
            .apply_event(order.id(), event(OrderEvent::SubmitPayment, Actor::customer("cust-1")))
            .await
            .unwrap();

        assert_eq!(order.state(), OrderState::PaymentConfirmed);
        assert_eq!(order.payment_state(), PaymentState::Captured);
        let last = order.history().last().unwrap();
        assert_eq!(last.actor.id, GATEWAY_ACTOR_ID);

        assert_eq!(store.db().products().stock("kurta").await.unwrap(), 8);
        assert_eq!(store.db().products().stock("mug").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_declined_capture_fails_payment_and_retry_is_capped() {
        let (store, _) = storefront(CaptureOutcome::Declined).await;
        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();
        let customer = Actor::customer("cust-1");

        let order = store
            .apply_event(order.id(), event(OrderEvent::SubmitPayment, customer.clone()))
            .await
            .unwrap();
        assert_eq!(order.state(), OrderState::PaymentFailed);

        // Default cap is 3 retries, each declined again
        for _ in 0..3 {
            let order = store
                .apply_event(order.id(), event(OrderEvent::RetryPayment, customer.clone()))
                .await
                .unwrap();
            assert_eq!(order.state(), OrderState::PaymentFailed);
        }

        let err = store
            .apply_event(order.id(), event(OrderEvent::RetryPayment, customer))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::RetryLimitExceeded);
        assert_eq!(store.db().products().stock("kurta").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_refund_cancellation_restocks_and_refunds() {
        let (store, gateway) = storefront(CaptureOutcome::Approved).await;
        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();
        let id = order.id();
        let admin = Actor::admin("ops");

        store
            .apply_event(id, event(OrderEvent::SubmitPayment, Actor::customer("cust-1")))
            .await
            .unwrap();
        store
            .apply_event(id, event(OrderEvent::StartProcessing, admin.clone()))
            .await
            .unwrap();
        assert_eq!(store.db().products().stock("kurta").await.unwrap(), 8);

        let order = store
            .apply_event(id, event(OrderEvent::CancelWithRefund, admin))
            .await
            .unwrap();

        assert_eq!(order.state(), OrderState::Cancelled);
        assert_eq!(order.payment_state(), PaymentState::Refunded);
        assert_eq!(store.db().products().stock("kurta").await.unwrap(), 10);
        assert_eq!(store.db().products().stock("mug").await.unwrap(), 5);
        assert_eq!(*gateway.refunds.lock().unwrap(), vec![(id, order.total())]);
    }

    /// Fails the first `failures` captures, then approves.
    struct FlakyGateway {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl PaymentGateway for FlakyGateway {
        async fn capture(
            &self,
            _order_id: Uuid,
            _amount: Money,
            _method: PaymentMethod,
        ) -> CollaboratorResult<CaptureOutcome> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(CollaboratorError::Gateway("timeout".into()));
            }
            Ok(CaptureOutcome::Approved)
        }

        async fn refund(&self, _order_id: Uuid, _amount: Money) -> CollaboratorResult<()> {
            Ok(())
        }
    }

    async fn flaky_store(failures: u32) -> (Storefront, Arc<FlakyGateway>) {
        let db = db().await;
        let gateway = Arc::new(FlakyGateway {
            failures,
            calls: AtomicU32::new(0),
        });
        let collaborators = Collaborators::sqlite(&db).with_payments(gateway.clone());
        (Storefront::new(db, collaborators, &config()), gateway)
    }

    #[tokio::test]
    async fn test_transient_gateway_failure_is_retried() {
        let (store, gateway) = flaky_store(2).await;
        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();

        let order = store
            .apply_event(order.id(), event(OrderEvent::SubmitPayment, Actor::customer("cust-1")))
            .await
            .unwrap();

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 3);
        assert_eq!(order.state(), OrderState::PaymentConfirmed);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_order_pending() {
        let (store, gateway) = flaky_store(10).await;
        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();

        let order = store
            .apply_event(order.id(), event(OrderEvent::SubmitPayment, Actor::customer("cust-1")))
            .await
            .unwrap();

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 3);
        assert_eq!(order.state(), OrderState::PaymentPending);
    }

    /// Approves every capture, slowly, after telling `capturing`.
    #[derive(Default)]
    struct SlowApprove {
        capturing: Notify,
        refunds: Mutex<Vec<(Uuid, Money)>>,
    }

    #[async_trait]
    impl PaymentGateway for SlowApprove {
        async fn capture(
            &self,
            _order_id: Uuid,
            _amount: Money,
            _method: PaymentMethod,
        ) -> CollaboratorResult<CaptureOutcome> {
            self.capturing.notify_one();
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(CaptureOutcome::Approved)
        }

        async fn refund(&self, order_id: Uuid, amount: Money) -> CollaboratorResult<()> {
            self.refunds.lock().unwrap().push((order_id, amount));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_queued_during_capture_sees_the_outcome() {
        let db = db().await;
        let gateway = Arc::new(SlowApprove::default());
        let collaborators = Collaborators::sqlite(&db).with_payments(gateway.clone());
        let store = Arc::new(Storefront::new(db, collaborators, &config()));
        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();
        let id = order.id();

        // The customer cancels while the gateway is still answering
        let cancel = {
            let store = store.clone();
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway.capturing.notified().await;
                store
                    .apply_event(id, event(OrderEvent::Cancel, Actor::customer("cust-1")))
                    .await
            })
        };

        let submitted = store
            .apply_event(id, event(OrderEvent::SubmitPayment, Actor::customer("cust-1")))
            .await
            .unwrap();
        assert_eq!(submitted.state(), OrderState::PaymentConfirmed);

        let cancelled = cancel.await.unwrap().unwrap();
        assert_eq!(cancelled.state(), OrderState::Cancelled);
        assert_eq!(cancelled.payment_state(), PaymentState::Refunded);
        assert_eq!(*gateway.refunds.lock().unwrap(), vec![(id, cancelled.total())]);

        assert_eq!(store.db().products().stock("kurta").await.unwrap(), 10);
        assert_eq!(store.db().products().stock("mug").await.unwrap(), 5);
    }

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<(Uuid, OrderState)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, order_id: Uuid, state: OrderState) {
            self.seen.lock().unwrap().push((order_id, state));
        }
    }

    #[tokio::test]
    async fn test_every_accepted_transition_notifies() {
        let db = db().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let collaborators = Collaborators::sqlite(&db).with_notifier(notifier.clone());
        let store = Storefront::new(db, collaborators, &config());

        let order = store.checkout(checkout_request("cust-1", None)).await.unwrap();
        let cancel = event(OrderEvent::Cancel, Actor::customer("cust-1"));
        store.apply_event(order.id(), cancel.clone()).await.unwrap();
        // Replay: no transition, no notification
        store.apply_event(order.id(), cancel).await.unwrap();

        let seen = notifier.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![(order.id(), OrderState::Created), (order.id(), OrderState::Cancelled)]
        );
    }
}
