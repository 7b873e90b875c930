//! Cart and line item types.
//!
//! One cart per owner. Line items are deduplicated by
//! `(product_id, variant_id)`; quantities live in `[1, 99]` with updates
//! to zero or below deleting the line instead of storing it. Price
//! snapshots are re-captured on every successful mutation, so the cart
//! never trusts a stale client-supplied price.

use crate::error::CommerceError;
use crate::ids::{CartId, LineItemId, ProductId, VariantId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use vendo_identity::CartOwner;

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 99;

/// A line item in a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineItem {
    /// Unique line item identifier.
    pub id: LineItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Variant, for variable products.
    pub variant_id: Option<VariantId>,
    /// Quantity, always in `[1, 99]` while stored.
    pub quantity: i64,
    /// Unit price captured at the most recent mutation.
    pub price_snapshot: Money,
    /// Unix timestamp the line was first added.
    pub added_at: i64,
}

impl CartLineItem {
    /// Whether this line is the one for the given identity key.
    pub fn matches(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        &self.product_id == product_id && self.variant_id.as_ref() == variant_id
    }
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Storage key of the owning identity.
    pub owner_key: String,
    /// Items in the cart; no two share an identity key.
    pub items: Vec<CartLineItem>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Cart {
    /// Create an empty cart for an owner.
    ///
    /// Carts are created lazily on an owner's first mutation.
    pub fn new(owner: &CartOwner) -> Self {
        let now = current_timestamp();
        Self {
            id: CartId::generate(),
            owner_key: owner.storage_key(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by its identity key.
    pub fn find_line(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.matches(product_id, variant_id))
    }

    /// Get a line by its line item ID.
    pub fn get_line(&self, line_item_id: &LineItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|i| &i.id == line_item_id)
    }

    /// The quantity an increment of `delta` would leave on the key's
    /// line, after clamping. What the advisory stock check validates.
    pub fn prospective_quantity(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        delta: i64,
    ) -> i64 {
        let existing = self
            .find_line(product_id, variant_id)
            .map(|i| i.quantity)
            .unwrap_or(0);
        existing.saturating_add(delta).min(MAX_QUANTITY_PER_ITEM)
    }

    /// Merge `delta` units into the line for the given key, capturing a
    /// fresh price snapshot.
    ///
    /// Inserts the line if the key is absent, clamps the result to
    /// [`MAX_QUANTITY_PER_ITEM`], and removes the line outright if the
    /// result lands at or below zero. Returns the line's ID while it
    /// still exists.
    pub fn apply_increment(
        &mut self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        delta: i64,
        snapshot: Money,
    ) -> Option<LineItemId> {
        self.updated_at = current_timestamp();

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.matches(product_id, variant_id))
        {
            let quantity = existing
                .quantity
                .saturating_add(delta)
                .min(MAX_QUANTITY_PER_ITEM);
            if quantity <= 0 {
                let id = existing.id.clone();
                self.items.retain(|i| i.id != id);
                return None;
            }
            existing.quantity = quantity;
            existing.price_snapshot = snapshot;
            return Some(existing.id.clone());
        }

        if delta <= 0 {
            return None;
        }
        let item = CartLineItem {
            id: LineItemId::generate(),
            product_id: product_id.clone(),
            variant_id: variant_id.cloned(),
            quantity: delta.min(MAX_QUANTITY_PER_ITEM),
            price_snapshot: snapshot,
            added_at: current_timestamp(),
        };
        let id = item.id.clone();
        self.items.push(item);
        Some(id)
    }

    /// Set a line's quantity outright, capturing a fresh snapshot.
    ///
    /// A quantity at or below zero removes the line; that is a valid
    /// request, not an error.
    pub fn apply_set_quantity(
        &mut self,
        line_item_id: &LineItemId,
        quantity: i64,
        snapshot: Money,
    ) -> Result<(), CommerceError> {
        if quantity <= 0 {
            self.remove_line(line_item_id);
            return Ok(());
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| &i.id == line_item_id)
            .ok_or_else(|| CommerceError::ItemNotInCart(line_item_id.to_string()))?;
        item.quantity = quantity.min(MAX_QUANTITY_PER_ITEM);
        item.price_snapshot = snapshot;
        self.updated_at = current_timestamp();
        Ok(())
    }

    /// Remove a line by ID. Returns whether anything was removed.
    pub fn remove_line(&mut self, line_item_id: &LineItemId) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| &i.id != line_item_id);
        let removed = self.items.len() < len_before;
        if removed {
            self.updated_at = current_timestamp();
        }
        removed
    }

    /// Clear all items. Clearing an empty cart is a no-op.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.updated_at = current_timestamp();
    }

    /// Absorb a guest line during login merge.
    ///
    /// If this cart already holds the key, the existing line wins and
    /// the guest line is discarded; merge never sums quantities. The
    /// caller re-validates and re-snapshots the line before passing it
    /// in, so the guest's pre-login snapshot never survives the merge.
    pub fn absorb_guest_line(&mut self, line: CartLineItem) {
        if self
            .find_line(&line.product_id, line.variant_id.as_ref())
            .is_some()
        {
            return;
        }
        self.items.push(line);
        self.updated_at = current_timestamp();
    }
}

/// One line of a cart read, joined with live pricing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartViewLine {
    /// Stored line item ID, for follow-up mutations.
    pub line_item_id: LineItemId,
    /// Product on the line.
    pub product_id: ProductId,
    /// Variant, if any.
    pub variant_id: Option<VariantId>,
    /// SKU from the live catalog.
    pub sku: String,
    /// Display name from the live catalog.
    pub name: String,
    /// Quantity.
    pub quantity: i64,
    /// Current effective unit price.
    pub unit_price: Money,
    /// `unit_price * quantity`.
    pub line_total: Money,
}

/// The customer-facing read model of a cart.
///
/// Items whose product has gone inactive or missing are absent here and
/// from the totals, while remaining untouched in storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartView {
    /// Visible lines only.
    pub items: Vec<CartViewLine>,
    /// Sum of visible line totals.
    pub subtotal: Money,
    /// Sum of visible quantities.
    pub item_count: i64,
    /// Currency of the totals.
    pub currency: Currency,
}

impl CartView {
    /// An empty view, for owners with no cart yet.
    pub fn empty(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            subtotal: Money::zero(currency),
            item_count: 0,
            currency,
        }
    }

    /// Build a view from visible lines.
    pub fn from_lines(items: Vec<CartViewLine>, currency: Currency) -> Result<Self, CommerceError> {
        let subtotal = Money::try_sum(items.iter().map(|i| &i.line_total), currency)
            .ok_or(CommerceError::Overflow)?;
        let item_count = items.iter().map(|i| i.quantity).sum();
        Ok(Self {
            items,
            subtotal,
            item_count,
            currency,
        })
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendo_identity::GuestToken;

    fn guest_cart() -> Cart {
        Cart::new(&CartOwner::guest(GuestToken::generate()))
    }

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_increment_inserts_then_merges() {
        let mut cart = guest_cart();
        let p = ProductId::new("p-1");

        cart.apply_increment(&p, None, 1, usd(1000)).unwrap();
        cart.apply_increment(&p, None, 2, usd(1000)).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[test]
    fn test_variant_distinguishes_lines() {
        let mut cart = guest_cart();
        let p = ProductId::new("p-1");
        let v = VariantId::new("v-1");

        cart.apply_increment(&p, None, 1, usd(1000));
        cart.apply_increment(&p, Some(&v), 1, usd(1200));

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_increment_clamps_at_max() {
        let mut cart = guest_cart();
        let p = ProductId::new("p-1");

        cart.apply_increment(&p, None, 98, usd(1000));
        cart.apply_increment(&p, None, 50, usd(1000));

        assert_eq!(cart.items[0].quantity, MAX_QUANTITY_PER_ITEM);
    }

    #[test]
    fn test_increment_to_zero_removes() {
        let mut cart = guest_cart();
        let p = ProductId::new("p-1");

        cart.apply_increment(&p, None, 2, usd(1000));
        let id = cart.apply_increment(&p, None, -2, usd(1000));

        assert!(id.is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_negative_increment_on_absent_key_is_noop() {
        let mut cart = guest_cart();
        assert!(cart
            .apply_increment(&ProductId::new("p-1"), None, -3, usd(1000))
            .is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_increment_refreshes_snapshot() {
        let mut cart = guest_cart();
        let p = ProductId::new("p-1");

        cart.apply_increment(&p, None, 1, usd(1000));
        cart.apply_increment(&p, None, 1, usd(900));

        assert_eq!(cart.items[0].price_snapshot, usd(900));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = guest_cart();
        let p = ProductId::new("p-1");
        let id = cart.apply_increment(&p, None, 2, usd(1000)).unwrap();

        cart.apply_set_quantity(&id, 0, usd(1000)).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_line_errors() {
        let mut cart = guest_cart();
        let err = cart
            .apply_set_quantity(&LineItemId::new("nope"), 3, usd(1000))
            .unwrap_err();
        assert!(matches!(err, CommerceError::ItemNotInCart(_)));
    }

    #[test]
    fn test_quantity_invariant_over_random_ops() {
        // Arbitrary mutation sequence: every stored line stays in
        // [1, 99] and no two lines share a key.
        let mut cart = guest_cart();
        let products: Vec<ProductId> =
            (0..4).map(|i| ProductId::new(format!("p-{}", i))).collect();
        let deltas = [5, -3, 120, 1, -200, 99, 7, -1, 50, 2, -98, 33];

        for (i, delta) in deltas.iter().enumerate() {
            let p = &products[i % products.len()];
            cart.apply_increment(p, None, *delta, usd(1000));
        }

        for item in &cart.items {
            assert!(item.quantity >= 1 && item.quantity <= MAX_QUANTITY_PER_ITEM);
        }
        for (i, a) in cart.items.iter().enumerate() {
            for b in &cart.items[i + 1..] {
                assert!(!(a.product_id == b.product_id && a.variant_id == b.variant_id));
            }
        }
    }

    #[test]
    fn test_absorb_guest_line_user_wins() {
        let mut user_cart = guest_cart();
        let p = ProductId::new("p-1");
        user_cart.apply_increment(&p, None, 2, usd(1000));

        let mut guest = guest_cart();
        guest.apply_increment(&p, None, 5, usd(800));

        user_cart.absorb_guest_line(guest.items[0].clone());

        assert_eq!(user_cart.items.len(), 1);
        assert_eq!(user_cart.items[0].quantity, 2);
        assert_eq!(user_cart.items[0].price_snapshot, usd(1000));
    }

    #[test]
    fn test_clear_empty_cart_is_noop() {
        let mut cart = guest_cart();
        let before = cart.updated_at;
        cart.clear();
        assert_eq!(cart.updated_at, before);
    }

    #[test]
    fn test_view_totals() {
        let lines = vec![
            CartViewLine {
                line_item_id: LineItemId::new("l-1"),
                product_id: ProductId::new("p-1"),
                variant_id: None,
                sku: "SKU-1".to_string(),
                name: "Widget".to_string(),
                quantity: 2,
                unit_price: usd(2000),
                line_total: usd(4000),
            },
            CartViewLine {
                line_item_id: LineItemId::new("l-2"),
                product_id: ProductId::new("p-2"),
                variant_id: None,
                sku: "SKU-2".to_string(),
                name: "Gadget".to_string(),
                quantity: 1,
                unit_price: usd(500),
                line_total: usd(500),
            },
        ];
        let view = CartView::from_lines(lines, Currency::USD).unwrap();
        assert_eq!(view.subtotal, usd(4500));
        assert_eq!(view.item_count, 3);
    }
}
