//! Cart summary and order placement.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use emporium_core::{
    Actor, Cart, CoreError, Coupon, CouponRejection, NewOrder, Order, PriceSummary,
    PricingError, PricingMode,
};

use super::{CartRequest, CheckoutRequest, Storefront};
use crate::error::ApiResult;

impl Storefront {
    /// Prices a cart for display. An empty cart prices to zero.
    pub async fn preview(&self, request: &CartRequest) -> ApiResult<PriceSummary> {
        let cart = self.build_cart(request).await?;
        let coupon = self.load_coupon(&cart).await?;

        let summary = self.pricing.compute_summary(
            &cart,
            coupon.as_ref(),
            request.shipping_method,
            PricingMode::Preview,
            Utc::now(),
        )?;

        debug!(
            lines = cart.line_count(),
            total = summary.total.minor(),
            "Cart summary computed"
        );
        Ok(summary)
    }

    /// Places an order: price, create, persist together with the coupon
    /// redemption, then run the creation effects.
    pub async fn checkout(&self, request: CheckoutRequest) -> ApiResult<Order> {
        let now = Utc::now();
        let cart = self.build_cart(&request.cart).await?;
        let coupon = self.load_coupon(&cart).await?;

        let summary = self.pricing.compute_summary(
            &cart,
            coupon.as_ref(),
            request.cart.shipping_method,
            PricingMode::Checkout,
            now,
        )?;

        let transition = self.lifecycle.create_order(NewOrder {
            id: Uuid::new_v4(),
            customer_id: request.customer_id.clone(),
            cart,
            summary,
            shipping_method: request.cart.shipping_method,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            actor: Actor::customer(request.customer_id),
            at: now,
        })?;

        // Fails with InvalidCoupon when the last redemption went to a
        // concurrent checkout.
        self.db.orders().insert(&transition.order).await?;
        info!(
            order_id = %transition.order.id(),
            customer_id = %transition.order.customer_id(),
            total = summary.total.minor(),
            "Order placed"
        );

        Ok(self.settle(transition).await)
    }

    /// Builds a cart from client lines, taking names, prices and stock from
    /// the catalog.
    async fn build_cart(&self, request: &CartRequest) -> ApiResult<Cart> {
        let mut cart = Cart::new();

        for line in &request.items {
            let product = self
                .collaborators
                .catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            cart.add_product(&product, line.variant_key.clone(), line.quantity)?;
        }

        if let Some(code) = request.coupon_code.as_deref() {
            if !code.trim().is_empty() {
                cart.apply_coupon(code)?;
            }
        }

        Ok(cart)
    }

    /// Fetches the coupon named on the cart. Empty carts skip the lookup.
    async fn load_coupon(&self, cart: &Cart) -> ApiResult<Option<Coupon>> {
        let code = match cart.coupon_code() {
            Some(code) if !cart.is_empty() => code,
            _ => return Ok(None),
        };

        match self.collaborators.coupons.get_coupon(code).await? {
            Some(coupon) => Ok(Some(coupon)),
            None => Err(PricingError::invalid_coupon(code, CouponRejection::NotFound).into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CaptureOutcome;
    use crate::error::ErrorCode;
    use crate::service::test_support::{cart, checkout_request, storefront};
    use crate::service::CartLineRequest;
    use chrono::Duration;
    use emporium_core::{CouponKind, Money, OrderState, ShippingMethod};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_preview_worked_example() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let summary = store.preview(&cart(Some("save10"))).await.unwrap();

        // ₹1300 - ₹100 (capped) = ₹1200 net, free shipping, 18% tax
        assert_eq!(summary.subtotal.minor(), 130_000);
        assert_eq!(summary.discount.minor(), 10_000);
        assert_eq!(summary.shipping_fee.minor(), 0);
        assert_eq!(summary.tax.minor(), 21_600);
        assert_eq!(summary.total.minor(), 141_600);
        assert_eq!(summary.item_count, 3);
    }

    #[tokio::test]
    async fn test_preview_empty_cart_ignores_unknown_coupon() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let request = CartRequest {
            coupon_code: Some("NOSUCH".into()),
            ..CartRequest::default()
        };
        assert_eq!(store.preview(&request).await.unwrap(), PriceSummary::zero());
    }

    #[tokio::test]
    async fn test_preview_unknown_coupon_rejected() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let err = store.preview(&cart(Some("NOSUCH"))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCoupon);
    }

    #[tokio::test]
    async fn test_preview_unknown_product() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let mut request = cart(None);
        request.items[0].product_id = "ghost".into();
        let err = store.preview(&request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_preview_over_stock() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let mut request = cart(None);
        request.items[1].quantity = 6;
        let err = store.preview(&request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[tokio::test]
    async fn test_checkout_creates_order_and_redeems_coupon() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let order = store
            .checkout(checkout_request("cust-1", Some("SAVE10")))
            .await
            .unwrap();

        assert_eq!(order.state(), OrderState::Created);
        assert_eq!(order.version(), 1);
        assert_eq!(order.total().minor(), 141_600);
        assert_eq!(order.coupon_code(), Some("SAVE10"));

        let stored = store.db().orders().get_by_id(order.id()).await.unwrap();
        assert_eq!(stored, Some(order));

        let coupon = store.db().coupons().get_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);

        // Usage limit is 1: the next checkout with the same code is refused
        let err = store
            .checkout(checkout_request("cust-2", Some("SAVE10")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCoupon);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_cannot_overrun_usage_limit() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .checkout(checkout_request(&format!("cust-{}", i), Some("SAVE10")))
                        .await
                })
            })
            .collect();

        let mut placed = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(order) => placed.push(order),
                Err(e) => assert_eq!(e.code, ErrorCode::InvalidCoupon),
            }
        }

        // SAVE10 allows a single redemption
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].price_summary().discount.minor(), 10_000);
        let stored = store.db().orders().count_in_state(OrderState::Created).await.unwrap();
        assert_eq!(stored, 1);
        let coupon = store.db().coupons().get_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(coupon.used_count, 1);
    }

    #[tokio::test]
    async fn test_checkout_does_not_touch_stock() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        store.checkout(checkout_request("cust-1", None)).await.unwrap();
        assert_eq!(store.db().products().stock("kurta").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        let mut request = checkout_request("cust-1", None);
        request.cart.items.clear();

        let err = store.checkout(request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);
    }

    #[tokio::test]
    async fn test_checkout_free_shipping_uses_discounted_subtotal() {
        let (store, _) = storefront(CaptureOutcome::Pending).await;
        store
            .db()
            .coupons()
            .insert(&Coupon {
                code: "FLAT300".into(),
                kind: CouponKind::FixedAmount {
                    amount: Money::from_minor(30_000),
                },
                min_order_amount: Money::zero(),
                valid_from: Utc::now() - Duration::days(1),
                valid_to: Utc::now() + Duration::days(1),
                usage_limit: None,
                used_count: 0,
            })
            .await
            .unwrap();

        // mug ×4 = ₹1200, minus ₹300 = ₹900 net, below the ₹1000 threshold
        let mut request = checkout_request("cust-1", Some("FLAT300"));
        request.cart.items = vec![CartLineRequest {
            product_id: "mug".into(),
            variant_key: None,
            quantity: 4,
        }];
        request.cart.shipping_method = ShippingMethod::Standard;

        let order = store.checkout(request).await.unwrap();
        let summary = order.price_summary();
        assert_eq!(summary.subtotal.minor(), 120_000);
        assert_eq!(summary.discount.minor(), 30_000);
        assert_eq!(summary.shipping_fee.minor(), 10_000);
        assert_eq!(summary.tax.minor(), 16_200);
        assert_eq!(summary.total.minor(), 116_200);
    }
}
