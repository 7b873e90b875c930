//! Read-only catalog pricing view and the two-tier stock checks.
//!
//! The product catalog itself belongs to an external collaborator; the
//! cart and checkout engines consume only this projection of it. Stock
//! is checked twice with distinct error kinds: an advisory check at
//! cart-mutation time and an authoritative re-check at finalization.
//! The split is deliberate; collapsing them would hide real races
//! between "add to cart" and "place order".

use crate::error::CommerceError;
use crate::ids::{ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Live pricing and availability for one purchasable item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingView {
    /// Product this view projects.
    pub product_id: ProductId,
    /// Variant, for variable products.
    pub variant_id: Option<VariantId>,
    /// SKU (denormalized for error messages and order snapshots).
    pub sku: String,
    /// Display name (denormalized for order snapshots).
    pub name: String,
    /// Base unit price.
    pub base_price: Money,
    /// Sale price, if the product is on sale.
    pub sale_price: Option<Money>,
    /// Variant-specific price override.
    pub variant_price: Option<Money>,
    /// Units currently available.
    pub available_stock: i64,
    /// Whether orders may exceed available stock.
    pub allow_backorder: bool,
    /// Whether the item is visible and purchasable at all.
    pub is_active: bool,
}

impl PricingView {
    /// A minimal active view with a base price; fields default sane.
    pub fn new(
        product_id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        base_price: Money,
        available_stock: i64,
    ) -> Self {
        Self {
            product_id,
            variant_id: None,
            sku: sku.into(),
            name: name.into(),
            base_price,
            sale_price: None,
            variant_price: None,
            available_stock,
            allow_backorder: false,
            is_active: true,
        }
    }

    /// Set the variant this view projects.
    pub fn with_variant(mut self, variant_id: VariantId, variant_price: Option<Money>) -> Self {
        self.variant_id = Some(variant_id);
        self.variant_price = variant_price;
        self
    }

    /// Set a sale price.
    pub fn with_sale_price(mut self, sale_price: Money) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    /// Allow backorders.
    pub fn with_backorder(mut self) -> Self {
        self.allow_backorder = true;
        self
    }

    /// The price a unit actually sells for right now.
    ///
    /// Variant price wins outright if present; otherwise the sale price
    /// applies only when it undercuts the base price.
    pub fn effective_unit_price(&self) -> Money {
        if let Some(price) = self.variant_price {
            return price;
        }
        match self.sale_price {
            Some(sale) if sale.amount_cents < self.base_price.amount_cents => sale,
            _ => self.base_price,
        }
    }

    /// Whether the given quantity can be satisfied right now.
    pub fn can_satisfy(&self, quantity: i64) -> bool {
        self.allow_backorder || self.available_stock >= quantity
    }
}

/// Advisory stock check for cart mutations.
///
/// Advisory only: nothing is reserved, and the answer can go stale the
/// moment it is returned. The authoritative re-check happens at order
/// finalization.
pub fn check_stock_advisory(view: &PricingView, quantity: i64) -> Result<(), CommerceError> {
    if view.allow_backorder {
        return Ok(());
    }
    if view.available_stock <= 0 {
        return Err(CommerceError::OutOfStock {
            sku: view.sku.clone(),
        });
    }
    if quantity > view.available_stock {
        return Err(CommerceError::InsufficientStock {
            sku: view.sku.clone(),
            requested: quantity,
            available: view.available_stock,
        });
    }
    Ok(())
}

/// One line the authoritative checkout-time stock check rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockIssue {
    /// Product whose stock fell short.
    pub product_id: ProductId,
    /// Variant, if the line targets one.
    pub variant_id: Option<VariantId>,
    /// SKU, for user-facing messages.
    pub sku: String,
    /// Quantity the cart wanted.
    pub requested: i64,
    /// Stock actually available.
    pub available: i64,
}

/// Authoritative stock check at order finalization.
///
/// Returns the issue rather than an error so the finalizer can gather
/// every offending line before rejecting the checkout.
pub fn check_stock_authoritative(view: &PricingView, quantity: i64) -> Option<StockIssue> {
    if view.can_satisfy(quantity) {
        return None;
    }
    Some(StockIssue {
        product_id: view.product_id.clone(),
        variant_id: view.variant_id.clone(),
        sku: view.sku.clone(),
        requested: quantity,
        available: view.available_stock,
    })
}
