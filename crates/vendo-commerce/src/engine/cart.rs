//! Cart operations.

use crate::cart::{Cart, CartView, CartViewLine, MAX_QUANTITY_PER_ITEM};
use crate::catalog::{check_stock_advisory, PricingView};
use crate::error::CommerceError;
use crate::ids::{LineItemId, ProductId, VariantId};
use crate::money::Currency;
use crate::store::{CartStore, CatalogStore};
use std::sync::Arc;
use tracing::debug;
use vendo_identity::CartOwner;

/// Owns the mutable line-item list for each cart owner.
///
/// Stock checks here are advisory: re-checked, never reserved. The
/// authoritative check runs again at order finalization, which is the
/// place that may still reject a cart this engine accepted.
pub struct CartEngine {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartEngine {
    /// Create the engine over its stores.
    pub fn new(carts: Arc<dyn CartStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { carts, catalog }
    }

    /// Read the owner's cart, joined with live pricing.
    ///
    /// Owners without a cart get an empty view; no cart is created by
    /// reading. Items whose product went inactive or missing stay in
    /// storage but are absent from the view and its totals.
    pub async fn get_cart(&self, owner: &CartOwner) -> Result<CartView, CommerceError> {
        match self.carts.find(owner).await? {
            Some(cart) => self.view_of(&cart).await,
            None => Ok(CartView::empty(Currency::default())),
        }
    }

    /// Add `quantity` units of an item, deduplicating by
    /// `(product, variant)` and re-capturing the price snapshot.
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<CartView, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let view = self.purchasable_view(product_id, variant_id).await?;

        // Validate the quantity the line would end up holding, not
        // just the delta.
        let prospective = match self.carts.find(owner).await? {
            Some(cart) => cart.prospective_quantity(product_id, variant_id, quantity),
            None => quantity.min(MAX_QUANTITY_PER_ITEM),
        };
        check_stock_advisory(&view, prospective)?;

        let snapshot = view.effective_unit_price();
        let cart = self
            .carts
            .increment_line(owner, product_id, variant_id, quantity, snapshot)
            .await?;
        debug!(owner = %owner, product = %product_id, quantity, "item added to cart");
        self.view_of(&cart).await
    }

    /// Set a line's quantity. Zero or below removes the line, which is
    /// a valid request rather than an error; any other quantity is
    /// stock-checked and re-snapshots the price.
    pub async fn update_quantity(
        &self,
        owner: &CartOwner,
        line_item_id: &LineItemId,
        quantity: i64,
    ) -> Result<CartView, CommerceError> {
        if quantity <= 0 {
            self.carts.remove_line(owner, line_item_id).await?;
            return self.get_cart(owner).await;
        }

        let cart = self
            .carts
            .find(owner)
            .await?
            .ok_or_else(|| CommerceError::ItemNotInCart(line_item_id.to_string()))?;
        let line = cart
            .get_line(line_item_id)
            .ok_or_else(|| CommerceError::ItemNotInCart(line_item_id.to_string()))?;

        let view = self
            .purchasable_view(&line.product_id, line.variant_id.as_ref())
            .await?;
        check_stock_advisory(&view, quantity.min(MAX_QUANTITY_PER_ITEM))?;

        let snapshot = view.effective_unit_price();
        match self
            .carts
            .set_line_quantity(owner, line_item_id, quantity, snapshot)
            .await?
        {
            Some(cart) => self.view_of(&cart).await,
            // The line raced away between read and write.
            None => Err(CommerceError::ItemNotInCart(line_item_id.to_string())),
        }
    }

    /// Remove a line unconditionally.
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        line_item_id: &LineItemId,
    ) -> Result<CartView, CommerceError> {
        self.carts.remove_line(owner, line_item_id).await?;
        self.get_cart(owner).await
    }

    /// Empty the cart. Clearing an absent or empty cart is a no-op.
    pub async fn clear(&self, owner: &CartOwner) -> Result<(), CommerceError> {
        if let Some(mut cart) = self.carts.find(owner).await? {
            cart.clear();
            self.carts.upsert(cart).await?;
        }
        Ok(())
    }

    /// Look up an item and insist it is purchasable.
    async fn purchasable_view(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<PricingView, CommerceError> {
        self.catalog
            .pricing_view(product_id, variant_id)
            .await?
            .filter(|v| v.is_active)
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))
    }

    /// Join stored lines with live pricing, dropping invisible items.
    async fn view_of(&self, cart: &Cart) -> Result<CartView, CommerceError> {
        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let Some(view) = self
                .catalog
                .pricing_view(&item.product_id, item.variant_id.as_ref())
                .await?
            else {
                continue;
            };
            if !view.is_active {
                continue;
            }
            let unit_price = view.effective_unit_price();
            let line_total = unit_price
                .try_multiply(item.quantity)
                .ok_or(CommerceError::Overflow)?;
            lines.push(CartViewLine {
                line_item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                variant_id: item.variant_id.clone(),
                sku: view.sku,
                name: view.name,
                quantity: item.quantity,
                unit_price,
                line_total,
            });
        }
        CartView::from_lines(lines, Currency::default())
    }
}
