//! In-memory store adapter.
//!
//! Backs the engine tests and works as a dev backend. Each collection
//! sits behind its own `tokio::sync::RwLock`; the atomic primitives of
//! the ports hold the relevant write locks for the whole
//! read-modify-write, which is all the atomicity a single process
//! needs.

use crate::cart::Cart;
use crate::catalog::PricingView;
use crate::coupon::{normalize_code, Coupon};
use crate::ids::{CouponId, LineItemId, OrderId, ProductId, VariantId, ZoneId};
use crate::money::Money;
use crate::order::Order;
use crate::shipping::ShippingZone;
use crate::store::{
    CartStore, CatalogStore, CommitOutcome, CouponRedemption, CouponStore, InventoryDelta,
    OrderStore, StoreError, WishlistStore, ZoneStore,
};
use crate::wishlist::Wishlist;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use vendo_identity::{CartOwner, UserId};

type ItemKey = (ProductId, Option<VariantId>);

/// In-memory implementation of every storage port.
#[derive(Default)]
pub struct MemoryStore {
    pricing: RwLock<HashMap<ItemKey, PricingView>>,
    carts: RwLock<HashMap<String, Cart>>,
    wishlists: RwLock<HashMap<String, Wishlist>>,
    zones: RwLock<Vec<ShippingZone>>,
    zone_seq: AtomicU64,
    coupons: RwLock<HashMap<String, Coupon>>,
    coupon_usage: RwLock<HashMap<(CouponId, String), i64>>,
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a catalog pricing view.
    pub async fn seed_pricing(&self, view: PricingView) {
        let key = (view.product_id.clone(), view.variant_id.clone());
        self.pricing.write().await.insert(key, view);
    }

    /// Overwrite an item's available stock (simulates concurrent sales
    /// in tests).
    pub async fn set_stock(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        stock: i64,
    ) {
        let key = (product_id.clone(), variant_id.cloned());
        if let Some(view) = self.pricing.write().await.get_mut(&key) {
            view.available_stock = stock;
        }
    }

    /// Current stock for an item, if seeded.
    pub async fn stock_of(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Option<i64> {
        let key = (product_id.clone(), variant_id.cloned());
        self.pricing.read().await.get(&key).map(|v| v.available_stock)
    }

    /// The stored cart for an owner (test inspection).
    pub async fn cart_of(&self, owner: &CartOwner) -> Option<Cart> {
        self.carts.read().await.get(&owner.storage_key()).cloned()
    }

    /// The stored wishlist for an owner (test inspection).
    pub async fn wishlist_of(&self, owner: &CartOwner) -> Option<Wishlist> {
        self.wishlists
            .read()
            .await
            .get(&owner.storage_key())
            .cloned()
    }

    /// Seed a coupon.
    pub async fn seed_coupon(&self, coupon: Coupon) {
        self.coupons
            .write()
            .await
            .insert(coupon.code.clone(), coupon);
    }

    /// Look a coupon up by ID (test inspection).
    pub async fn coupon_by_id(&self, id: &CouponId) -> Option<Coupon> {
        self.coupons
            .read()
            .await
            .values()
            .find(|c| &c.id == id)
            .cloned()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn pricing_view(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Option<PricingView>, StoreError> {
        let key = (product_id.clone(), variant_id.cloned());
        Ok(self.pricing.read().await.get(&key).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find(&self, owner: &CartOwner) -> Result<Option<Cart>, StoreError> {
        Ok(self.carts.read().await.get(&owner.storage_key()).cloned())
    }

    async fn upsert(&self, cart: Cart) -> Result<(), StoreError> {
        self.carts
            .write()
            .await
            .insert(cart.owner_key.clone(), cart);
        Ok(())
    }

    async fn increment_line(
        &self,
        owner: &CartOwner,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        delta: i64,
        snapshot: Money,
    ) -> Result<Cart, StoreError> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(owner.storage_key())
            .or_insert_with(|| Cart::new(owner));
        cart.apply_increment(product_id, variant_id, delta, snapshot);
        Ok(cart.clone())
    }

    async fn set_line_quantity(
        &self,
        owner: &CartOwner,
        line_item_id: &LineItemId,
        quantity: i64,
        snapshot: Money,
    ) -> Result<Option<Cart>, StoreError> {
        let mut carts = self.carts.write().await;
        let Some(cart) = carts.get_mut(&owner.storage_key()) else {
            return Ok(None);
        };
        match cart.apply_set_quantity(line_item_id, quantity, snapshot) {
            Ok(()) => Ok(Some(cart.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn remove_line(
        &self,
        owner: &CartOwner,
        line_item_id: &LineItemId,
    ) -> Result<bool, StoreError> {
        let mut carts = self.carts.write().await;
        Ok(carts
            .get_mut(&owner.storage_key())
            .map(|cart| cart.remove_line(line_item_id))
            .unwrap_or(false))
    }

    async fn delete(&self, owner: &CartOwner) -> Result<bool, StoreError> {
        Ok(self
            .carts
            .write()
            .await
            .remove(&owner.storage_key())
            .is_some())
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn find(&self, owner: &CartOwner) -> Result<Option<Wishlist>, StoreError> {
        Ok(self
            .wishlists
            .read()
            .await
            .get(&owner.storage_key())
            .cloned())
    }

    async fn upsert(&self, wishlist: Wishlist) -> Result<(), StoreError> {
        self.wishlists
            .write()
            .await
            .insert(wishlist.owner_key.clone(), wishlist);
        Ok(())
    }

    async fn delete(&self, owner: &CartOwner) -> Result<bool, StoreError> {
        Ok(self
            .wishlists
            .write()
            .await
            .remove(&owner.storage_key())
            .is_some())
    }
}

#[async_trait]
impl ZoneStore for MemoryStore {
    async fn all_zones(&self) -> Result<Vec<ShippingZone>, StoreError> {
        Ok(self.zones.read().await.clone())
    }

    async fn upsert(&self, mut zone: ShippingZone) -> Result<ZoneId, StoreError> {
        let mut zones = self.zones.write().await;
        if let Some(existing) = zones.iter_mut().find(|z| z.id == zone.id) {
            // The default flag only moves through set_default.
            zone.is_default = existing.is_default;
            zone.created_seq = existing.created_seq;
            *existing = zone.clone();
        } else {
            zone.created_seq = self.zone_seq.fetch_add(1, Ordering::SeqCst) + 1;
            zones.push(zone.clone());
        }
        Ok(zone.id)
    }

    async fn set_default(&self, zone_id: &ZoneId) -> Result<bool, StoreError> {
        let mut zones = self.zones.write().await;
        if !zones.iter().any(|z| &z.id == zone_id) {
            return Ok(false);
        }
        for zone in zones.iter_mut() {
            zone.is_default = &zone.id == zone_id;
        }
        Ok(true)
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.coupons.read().await.get(&normalize_code(code)).cloned())
    }

    async fn upsert(&self, coupon: Coupon) -> Result<(), StoreError> {
        self.seed_coupon(coupon).await;
        Ok(())
    }

    async fn user_usage(
        &self,
        coupon_id: &CouponId,
        user_id: &UserId,
    ) -> Result<i64, StoreError> {
        let key = (coupon_id.clone(), user_id.as_str().to_string());
        Ok(self.coupon_usage.read().await.get(&key).copied().unwrap_or(0))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn month_sequence(&self, month_prefix: &str) -> Result<u64, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.order_number.starts_with(month_prefix))
            .count() as u64)
    }

    async fn find(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.tracking_code.as_deref() == Some(code))
            .cloned())
    }

    async fn save(&self, order: Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id.clone(), order);
        Ok(())
    }

    async fn commit_finalized(
        &self,
        order: Order,
        redemption: Option<CouponRedemption>,
        inventory: Vec<InventoryDelta>,
    ) -> Result<CommitOutcome, StoreError> {
        // Lock order: orders, coupons, usage, pricing. Conflicts are
        // detected before any mutation so a failed commit applies
        // nothing.
        let mut orders = self.orders.write().await;
        if orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Ok(CommitOutcome::DuplicateOrderNumber);
        }
        if let Some(code) = order.tracking_code.as_deref() {
            if orders
                .values()
                .any(|o| o.tracking_code.as_deref() == Some(code))
            {
                return Ok(CommitOutcome::DuplicateTrackingCode);
            }
        }

        if let Some(redemption) = redemption {
            let mut coupons = self.coupons.write().await;
            if let Some(coupon) = coupons
                .values_mut()
                .find(|c| c.id == redemption.coupon_id)
            {
                coupon.record_usage();
            }
            if let Some(user_id) = redemption.user_id {
                let key = (redemption.coupon_id, user_id.as_str().to_string());
                *self.coupon_usage.write().await.entry(key).or_insert(0) += 1;
            }
        }

        let mut pricing = self.pricing.write().await;
        for delta in inventory {
            let key = (delta.product_id, delta.variant_id);
            if let Some(view) = pricing.get_mut(&key) {
                view.available_stock -= delta.quantity;
            }
        }

        orders.insert(order.id.clone(), order);
        Ok(CommitOutcome::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use crate::shipping::{ShippingMethod, ShippingMethodKind};

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[tokio::test]
    async fn test_set_default_is_exclusive() {
        let store = MemoryStore::new();
        let a = ZoneStore::upsert(&store, ShippingZone::new("A", vec!["US".to_string()]))
            .await
            .unwrap();
        let b = ZoneStore::upsert(&store, ShippingZone::new("B", vec!["CA".to_string()]))
            .await
            .unwrap();

        assert!(store.set_default(&a).await.unwrap());
        assert!(store.set_default(&b).await.unwrap());

        let zones = store.all_zones().await.unwrap();
        let defaults: Vec<_> = zones.iter().filter(|z| z.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, b);
    }

    #[tokio::test]
    async fn test_set_default_repairs_corrupted_state() {
        let store = MemoryStore::new();
        // Inject a corrupted table: two zones both flagged default.
        {
            let mut zones = store.zones.write().await;
            let mut a = ShippingZone::new("A", vec!["US".to_string()]);
            a.is_default = true;
            a.created_seq = 1;
            let mut b = ShippingZone::new("B", vec!["CA".to_string()]);
            b.is_default = true;
            b.created_seq = 2;
            zones.push(a);
            zones.push(b.clone());
        }

        let target = store.all_zones().await.unwrap()[0].id.clone();
        assert!(store.set_default(&target).await.unwrap());

        let zones = store.all_zones().await.unwrap();
        assert_eq!(zones.iter().filter(|z| z.is_default).count(), 1);
        assert!(zones.iter().find(|z| z.id == target).unwrap().is_default);
    }

    #[tokio::test]
    async fn test_set_default_missing_zone() {
        let store = MemoryStore::new();
        assert!(!store.set_default(&ZoneId::new("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_cannot_flip_default() {
        let store = MemoryStore::new();
        let id = ZoneStore::upsert(&store, ShippingZone::new("A", vec!["US".to_string()]))
            .await
            .unwrap();
        store.set_default(&id).await.unwrap();

        let mut edited = store.all_zones().await.unwrap()[0].clone();
        edited.is_default = false;
        edited.methods.push(ShippingMethod::new(
            ShippingMethodKind::Express,
            usd(999),
        ));
        ZoneStore::upsert(&store, edited).await.unwrap();

        let zones = store.all_zones().await.unwrap();
        assert!(zones[0].is_default);
        assert_eq!(zones[0].methods.len(), 1);
    }

    #[tokio::test]
    async fn test_zone_insertion_seq_is_monotonic() {
        let store = MemoryStore::new();
        ZoneStore::upsert(&store, ShippingZone::new("A", vec!["US".to_string()]))
            .await
            .unwrap();
        ZoneStore::upsert(&store, ShippingZone::new("B", vec!["CA".to_string()]))
            .await
            .unwrap();

        let zones = store.all_zones().await.unwrap();
        assert!(zones[0].created_seq < zones[1].created_seq);
    }

    #[tokio::test]
    async fn test_coupon_lookup_case_insensitive() {
        let store = MemoryStore::new();
        store.seed_coupon(Coupon::percentage("SAVE10", 10)).await;

        assert!(store.find_by_code("save10").await.unwrap().is_some());
        assert!(store.find_by_code(" Save10 ").await.unwrap().is_some());
        assert!(store.find_by_code("OTHER").await.unwrap().is_none());
    }
}
