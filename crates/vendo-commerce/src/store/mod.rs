//! Storage ports.
//!
//! The engines never touch a database directly; they speak to these
//! traits. Implementations must provide find-by-key, upsert, and the
//! few atomic primitives the consistency story leans on: line-item
//! increment, single-default zone flips, and the all-or-nothing order
//! commit.

pub mod memory;

use crate::cart::Cart;
use crate::catalog::PricingView;
use crate::coupon::Coupon;
use crate::ids::{CouponId, LineItemId, OrderId, ProductId, VariantId, ZoneId};
use crate::money::Money;
use crate::order::Order;
use crate::shipping::ShippingZone;
use crate::wishlist::Wishlist;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vendo_identity::{CartOwner, UserId};

/// Infrastructure fault in the storage layer.
///
/// Not recoverable by this core; propagated as-is with no side effects
/// left half-applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or failed mid-operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read-only view of the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Live pricing and availability for an item, or `None` if the
    /// catalog has never heard of it.
    async fn pricing_view(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Option<PricingView>, StoreError>;
}

/// Cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Find the owner's cart.
    async fn find(&self, owner: &CartOwner) -> Result<Option<Cart>, StoreError>;

    /// Write a cart wholesale, keyed by its owner.
    async fn upsert(&self, cart: Cart) -> Result<(), StoreError>;

    /// Atomically merge `delta` units into the line for the given key,
    /// creating the cart lazily if the owner has none. The whole
    /// read-modify-write happens under one lock so concurrent
    /// increments for one owner can never duplicate a line.
    async fn increment_line(
        &self,
        owner: &CartOwner,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        delta: i64,
        snapshot: Money,
    ) -> Result<Cart, StoreError>;

    /// Atomically set a line's quantity (at or below zero removes it).
    /// Returns the updated cart, or `None` if the owner has no cart or
    /// the line is gone.
    async fn set_line_quantity(
        &self,
        owner: &CartOwner,
        line_item_id: &LineItemId,
        quantity: i64,
        snapshot: Money,
    ) -> Result<Option<Cart>, StoreError>;

    /// Remove a line. Returns whether anything was removed.
    async fn remove_line(
        &self,
        owner: &CartOwner,
        line_item_id: &LineItemId,
    ) -> Result<bool, StoreError>;

    /// Delete the owner's cart record entirely (guest-merge cleanup).
    /// Deleting an absent cart returns `false`, not an error.
    async fn delete(&self, owner: &CartOwner) -> Result<bool, StoreError>;
}

/// Wishlist persistence.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// Find the owner's wishlist.
    async fn find(&self, owner: &CartOwner) -> Result<Option<Wishlist>, StoreError>;

    /// Write a wishlist wholesale, keyed by its owner.
    async fn upsert(&self, wishlist: Wishlist) -> Result<(), StoreError>;

    /// Delete the owner's wishlist record (guest-merge cleanup).
    async fn delete(&self, owner: &CartOwner) -> Result<bool, StoreError>;
}

/// Shipping zone persistence.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Every zone, active or not, in insertion order.
    async fn all_zones(&self) -> Result<Vec<ShippingZone>, StoreError>;

    /// Insert or update a zone. May not change the default flag; that
    /// is `set_default`'s job alone.
    async fn upsert(&self, zone: ShippingZone) -> Result<ZoneId, StoreError>;

    /// Make exactly this zone the default, clearing the flag everywhere
    /// else in the same atomic update. Repairs a corrupted
    /// multiple-default state as a side effect. Returns `false` if the
    /// zone does not exist.
    async fn set_default(&self, zone_id: &ZoneId) -> Result<bool, StoreError>;
}

/// Coupon persistence and usage history.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Case-insensitive lookup by code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    /// Insert or update a coupon, keyed by normalized code.
    async fn upsert(&self, coupon: Coupon) -> Result<(), StoreError>;

    /// How many times this user has redeemed this coupon.
    async fn user_usage(
        &self,
        coupon_id: &CouponId,
        user_id: &UserId,
    ) -> Result<i64, StoreError>;
}

/// A coupon redemption to record inside the order commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponRedemption {
    /// Coupon being redeemed.
    pub coupon_id: CouponId,
    /// Redeeming user; `None` for guests, whose per-user history is
    /// not tracked.
    pub user_id: Option<UserId>,
}

/// An inventory decrement to apply inside the order commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryDelta {
    /// Product to decrement.
    pub product_id: ProductId,
    /// Variant, if the line targets one.
    pub variant_id: Option<VariantId>,
    /// Units sold.
    pub quantity: i64,
}

/// How an order commit attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Order persisted; coupon and inventory side effects applied.
    Committed,
    /// Another order already holds this order number. Nothing was
    /// applied; recount and retry.
    DuplicateOrderNumber,
    /// Another order already holds this tracking code. Nothing was
    /// applied; regenerate and retry.
    DuplicateTrackingCode,
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Count of orders already numbered within a month bucket.
    async fn month_sequence(&self, month_prefix: &str) -> Result<u64, StoreError>;

    /// Find an order by ID.
    async fn find(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Find a guest order by its tracking code.
    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Order>, StoreError>;

    /// Persist an order whose status machine has advanced. Orders are
    /// otherwise immutable; this must not be used to rewrite totals or
    /// line items.
    async fn save(&self, order: Order) -> Result<(), StoreError>;

    /// The one mandatory atomic unit: persist the order and, only as
    /// part of the same commit, record the coupon redemption and apply
    /// the inventory decrements. On a uniqueness conflict nothing at
    /// all is applied and the conflicting part is reported.
    async fn commit_finalized(
        &self,
        order: Order,
        redemption: Option<CouponRedemption>,
        inventory: Vec<InventoryDelta>,
    ) -> Result<CommitOutcome, StoreError>;
}
