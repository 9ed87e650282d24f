//! # Cart
//!
//! The shopper's cart: an ordered list of line items plus an optional coupon.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront Action         Cart Method            Effect                │
//! │  ─────────────────         ───────────            ──────                │
//! │  Add to cart ────────────► add_product() ───────► merge or push line    │
//! │  Change quantity ────────► update_quantity() ───► qty = n (0 removes)   │
//! │  Remove ─────────────────► remove_item() ───────► drop line             │
//! │  Apply coupon ───────────► apply_coupon() ──────► coupon_code = CODE    │
//! │  Checkout / clear ───────► clear() ─────────────► empty cart            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `(product_id, variant_key)`
//! - Every line has `1 <= quantity <= MAX_ITEM_QUANTITY`
//! - At most `MAX_CART_ITEMS` distinct lines
//! - A failed operation leaves the cart unchanged
//!
//! The cart is a plain value owned by the caller's session. Nothing here
//! holds global state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{
    validate_coupon_code, validate_price, validate_product_id, validate_quantity,
};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Line Item
// =============================================================================

/// One product/variant/quantity entry in a cart or a frozen order.
///
/// `line_total` is always derived from `unit_price * quantity`; it is never
/// stored, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Product name when the line was added (frozen).
    pub name: String,
    /// Unit price when the line was added (frozen).
    pub unit_price: Money,
    pub quantity: u32,
    /// Size/colour key, e.g. `"M-BLUE"`. `None` for products without variants.
    pub variant_key: Option<String>,
}

impl LineItem {
    /// Creates a validated line item.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        variant_key: Option<String>,
    ) -> CoreResult<Self> {
        let product_id = product_id.into();
        validate_product_id(&product_id)?;
        validate_price(unit_price)?;
        validate_quantity(quantity)?;

        Ok(LineItem {
            product_id,
            name: name.into(),
            unit_price,
            quantity,
            variant_key,
        })
    }

    /// Creates a line from a catalog product, freezing its name and price.
    pub fn from_product(
        product: &Product,
        variant_key: Option<String>,
        quantity: u32,
    ) -> CoreResult<Self> {
        LineItem::new(
            product.id.clone(),
            product.name.clone(),
            product.unit_price,
            quantity,
            variant_key,
        )
    }

    /// `unit_price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// Whether this line has the given `(product_id, variant_key)` key.
    pub fn matches(&self, product_id: &str, variant_key: Option<&str>) -> bool {
        self.product_id == product_id && self.variant_key.as_deref() == variant_key
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart.
///
/// Fields are private so every mutation goes through the methods below and
/// keeps the invariants documented at module level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    items: Vec<LineItem>,
    coupon_code: Option<String>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Builds a cart from client-supplied lines, enforcing every invariant
    /// (duplicate keys are merged, quantities validated).
    pub fn from_lines(
        lines: impl IntoIterator<Item = LineItem>,
        coupon_code: Option<&str>,
    ) -> CoreResult<Self> {
        let mut cart = Cart::new();
        for line in lines {
            cart.add_item(line)?;
        }
        if let Some(code) = coupon_code {
            cart.apply_coupon(code)?;
        }
        Ok(cart)
    }

    /// Adds a line or merges it into an existing line with the same key.
    ///
    /// ## Behavior
    /// - Same `(product_id, variant_key)` already present: quantities add up,
    ///   the price frozen on the existing line is kept
    /// - Otherwise the line is appended
    pub fn add_item(&mut self, item: LineItem) -> CoreResult<()> {
        validate_quantity(item.quantity)?;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.matches(&item.product_id, item.variant_key.as_deref()))
        {
            let merged = existing.quantity as u64 + item.quantity as u64;
            if merged > MAX_ITEM_QUANTITY as u64 {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            existing.quantity = merged as u32;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(item);
        Ok(())
    }

    /// Adds a catalog product, refusing quantities beyond current stock.
    ///
    /// The stock check counts what is already in the cart for the same line.
    pub fn add_product(
        &mut self,
        product: &Product,
        variant_key: Option<String>,
        quantity: u32,
    ) -> CoreResult<()> {
        let in_cart = self
            .find(&product.id, variant_key.as_deref())
            .map(|line| line.quantity)
            .unwrap_or(0);
        let requested = in_cart as i64 + quantity as i64;

        if !product.can_sell(requested) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock_quantity,
                requested,
            });
        }

        self.add_item(LineItem::from_product(product, variant_key, quantity)?)
    }

    /// Sets the quantity of a line. A quantity of 0 removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        variant_key: Option<&str>,
        quantity: u32,
    ) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id, variant_key);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity as u64,
                max: MAX_ITEM_QUANTITY,
            });
        }

        match self
            .items
            .iter_mut()
            .find(|i| i.matches(product_id, variant_key))
        {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(line_not_found(product_id, variant_key)),
        }
    }

    /// Removes a line.
    pub fn remove_item(&mut self, product_id: &str, variant_key: Option<&str>) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|i| !i.matches(product_id, variant_key));

        if self.items.len() == before {
            Err(line_not_found(product_id, variant_key))
        } else {
            Ok(())
        }
    }

    /// Applies a coupon code (normalized to upper case).
    ///
    /// Only the code is stored; the coupon itself is fetched and validated at
    /// pricing time, so an applied code can still be rejected later.
    pub fn apply_coupon(&mut self, code: &str) -> CoreResult<()> {
        self.coupon_code = Some(validate_coupon_code(code)?);
        Ok(())
    }

    pub fn remove_coupon(&mut self) {
        self.coupon_code = None;
    }

    /// Empties the cart (after checkout or on explicit clear).
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn find(&self, product_id: &str, variant_key: Option<&str>) -> Option<&LineItem> {
        self.items.iter().find(|i| i.matches(product_id, variant_key))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| i.quantity as u64).sum()
    }

    /// Σ line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

fn line_not_found(product_id: &str, variant_key: Option<&str>) -> CoreError {
    CoreError::LineNotFound {
        product_id: product_id.to_string(),
        variant: variant_key.unwrap_or("default").to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            unit_price: Money::from_minor(price),
            stock_quantity: stock,
        }
    }

    #[test]
    fn test_add_same_line_merges_quantity() {
        let mut cart = Cart::new();
        let shirt = product("shirt", 99_900, 50);

        cart.add_product(&shirt, Some("M".into()), 2).unwrap();
        cart.add_product(&shirt, Some("M".into()), 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal().minor(), 499_500);
    }

    #[test]
    fn test_variants_are_distinct_lines() {
        let mut cart = Cart::new();
        let shirt = product("shirt", 99_900, 50);

        cart.add_product(&shirt, Some("M".into()), 1).unwrap();
        cart.add_product(&shirt, Some("L".into()), 1).unwrap();
        cart.add_product(&shirt, None, 1).unwrap();

        assert_eq!(cart.line_count(), 3);
    }

    #[test]
    fn test_merge_keeps_frozen_price() {
        let mut cart = Cart::new();
        cart.add_item(LineItem::new("mug", "Mug", Money::from_minor(30_000), 1, None).unwrap())
            .unwrap();
        cart.add_item(LineItem::new("mug", "Mug", Money::from_minor(35_000), 1, None).unwrap())
            .unwrap();

        assert_eq!(cart.items()[0].unit_price.minor(), 30_000);
        assert_eq!(cart.subtotal().minor(), 60_000);
    }

    #[test]
    fn test_add_product_checks_stock_including_cart() {
        let mut cart = Cart::new();
        let lamp = product("lamp", 150_000, 3);

        cart.add_product(&lamp, None, 2).unwrap();
        let err = cart.add_product(&lamp, None, 2).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_quantity_limit_rejects_without_mutation() {
        let mut cart = Cart::new();
        cart.add_item(LineItem::new("pen", "Pen", Money::from_minor(1_000), 998, None).unwrap())
            .unwrap();

        let err = cart
            .add_item(LineItem::new("pen", "Pen", Money::from_minor(1_000), 2, None).unwrap())
            .unwrap_err();

        assert!(matches!(err, CoreError::QuantityTooLarge { requested: 1000, .. }));
        assert_eq!(cart.items()[0].quantity, 998);
    }

    #[test]
    fn test_line_rejects_zero_quantity() {
        assert!(LineItem::new("pen", "Pen", Money::from_minor(1_000), 0, None).is_err());
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        let mug = product("mug", 30_000, 10);
        cart.add_product(&mug, None, 2).unwrap();

        cart.update_quantity("mug", None, 5).unwrap();
        assert_eq!(cart.total_quantity(), 5);

        cart.update_quantity("mug", None, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_missing_line() {
        let mut cart = Cart::new();
        let err = cart.remove_item("ghost", Some("XL")).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound { .. }));
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(
                LineItem::new(format!("p{}", i), "Item", Money::from_minor(100), 1, None).unwrap(),
            )
            .unwrap();
        }

        let err = cart
            .add_item(LineItem::new("one-more", "Item", Money::from_minor(100), 1, None).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
        assert_eq!(cart.line_count(), MAX_CART_ITEMS);
    }

    #[test]
    fn test_from_lines_merges_duplicates() {
        let line = LineItem::new("mug", "Mug", Money::from_minor(30_000), 1, None).unwrap();
        let cart = Cart::from_lines(vec![line.clone(), line], Some("save10")).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.coupon_code(), Some("SAVE10"));
    }

    #[test]
    fn test_clear_drops_coupon() {
        let mut cart = Cart::new();
        cart.add_product(&product("mug", 30_000, 10), None, 1).unwrap();
        cart.apply_coupon("FLAT50").unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.coupon_code(), None);
    }
}
