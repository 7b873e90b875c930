//! Identity resolution and the guest-to-user merge.

use crate::cart::Cart;
use crate::catalog::check_stock_advisory;
use crate::error::CommerceError;
use crate::store::{CartStore, CatalogStore, WishlistStore};
use crate::wishlist::Wishlist;
use std::sync::Arc;
use tracing::{debug, info};
use vendo_identity::{Actor, CartOwner, GuestToken, UserId};

/// Resolves who is shopping and folds guest state into user state on
/// login.
pub struct IdentityEngine {
    carts: Arc<dyn CartStore>,
    wishlists: Arc<dyn WishlistStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl IdentityEngine {
    /// Create the engine over its stores.
    pub fn new(
        carts: Arc<dyn CartStore>,
        wishlists: Arc<dyn WishlistStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            carts,
            wishlists,
            catalog,
        }
    }

    /// Resolve a request's actor to a cart owner.
    ///
    /// See [`vendo_identity::resolve`]: authenticated wins, malformed
    /// guest tokens mean "no identity yet".
    pub fn resolve(&self, actor: &Actor, guest_token: Option<&str>) -> Option<CartOwner> {
        vendo_identity::resolve(actor, guest_token)
    }

    /// Fold a guest's cart and wishlist into the user they just logged
    /// in as, then delete the guest records.
    ///
    /// Idempotent: once the guest records are gone, running this again
    /// (or concurrently from a second tab) finds nothing to merge and
    /// succeeds as a no-op.
    pub async fn merge_guest_into_user(
        &self,
        guest_token: &GuestToken,
        user_id: &UserId,
    ) -> Result<(), CommerceError> {
        let guest = CartOwner::Guest(guest_token.clone());
        let user = CartOwner::User(user_id.clone());
        self.merge_cart(&guest, &user).await?;
        self.merge_wishlist(&guest, &user).await?;
        Ok(())
    }

    /// Union of line items by `(product, variant)` key. The user's
    /// existing line always wins a conflict; surviving guest lines get
    /// their price snapshot re-captured, never carried over.
    async fn merge_cart(&self, guest: &CartOwner, user: &CartOwner) -> Result<(), CommerceError> {
        let Some(guest_cart) = self.carts.find(guest).await? else {
            debug!(guest = %guest, "no guest cart; merge is a no-op");
            return Ok(());
        };

        let mut user_cart = match self.carts.find(user).await? {
            Some(cart) => cart,
            None => Cart::new(user),
        };

        let mut carried = 0;
        for item in guest_cart.items {
            if user_cart
                .find_line(&item.product_id, item.variant_id.as_ref())
                .is_some()
            {
                continue;
            }
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
            if check_stock_advisory(&view, item.quantity).is_err() {
                debug!(sku = %view.sku, "guest line no longer in stock; dropped from merge");
                continue;
            }
            let mut line = item;
            line.price_snapshot = view.effective_unit_price();
            user_cart.absorb_guest_line(line);
            carried += 1;
        }

        self.carts.upsert(user_cart).await?;
        // A concurrent merge may have deleted the guest cart already;
        // that is success, not an error.
        let _ = self.carts.delete(guest).await?;
        info!(user = %user, carried, "guest cart merged");
        Ok(())
    }

    /// Wishlist merge is a plain set union; no quantities or prices.
    async fn merge_wishlist(
        &self,
        guest: &CartOwner,
        user: &CartOwner,
    ) -> Result<(), CommerceError> {
        let Some(guest_list) = self.wishlists.find(guest).await? else {
            return Ok(());
        };

        let mut user_list = match self.wishlists.find(user).await? {
            Some(list) => list,
            None => Wishlist::new(user),
        };
        user_list.union(&guest_list);

        self.wishlists.upsert(user_list).await?;
        let _ = self.wishlists.delete(guest).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PricingView;
    use crate::engine::{CartEngine, WishlistEngine};
    use crate::ids::ProductId;
    use crate::money::{Currency, Money};
    use crate::store::memory::MemoryStore;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        identity: IdentityEngine,
        carts: CartEngine,
        wishlists: WishlistEngine,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store
            .seed_pricing(PricingView::new(
                ProductId::new("p-tee"),
                "TEE-CLASSIC",
                "Classic Tee",
                usd(2000),
                10,
            ))
            .await;
        store
            .seed_pricing(PricingView::new(
                ProductId::new("p-mug"),
                "MUG-01",
                "Mug",
                usd(500),
                5,
            ))
            .await;
        Fixture {
            identity: IdentityEngine::new(store.clone(), store.clone(), store.clone()),
            carts: CartEngine::new(store.clone(), store.clone()),
            wishlists: WishlistEngine::new(store.clone()),
            store,
        }
    }

    #[tokio::test]
    async fn test_merge_unions_and_deletes_guest() {
        let f = fixture().await;
        let token = GuestToken::generate();
        let guest = CartOwner::Guest(token.clone());
        let user_id = UserId::new("u-1");
        let user = CartOwner::User(user_id.clone());

        f.carts
            .add_item(&guest, &ProductId::new("p-mug"), None, 2)
            .await
            .unwrap();
        f.carts
            .add_item(&user, &ProductId::new("p-tee"), None, 1)
            .await
            .unwrap();

        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();

        let view = f.carts.get_cart(&user).await.unwrap();
        assert_eq!(view.items.len(), 2);
        assert!(f.store.cart_of(&guest).await.is_none());
    }

    #[tokio::test]
    async fn test_merge_conflict_keeps_user_line() {
        let f = fixture().await;
        let token = GuestToken::generate();
        let guest = CartOwner::Guest(token.clone());
        let user_id = UserId::new("u-1");
        let user = CartOwner::User(user_id.clone());
        let tee = ProductId::new("p-tee");

        // Quantities differ; after merge the user's 1 survives, never
        // the sum.
        f.carts.add_item(&guest, &tee, None, 5).await.unwrap();
        f.carts.add_item(&user, &tee, None, 1).await.unwrap();

        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();

        let cart = f.store.cart_of(&user).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_merge_revalidates_guest_snapshot() {
        let f = fixture().await;
        let token = GuestToken::generate();
        let guest = CartOwner::Guest(token.clone());
        let user_id = UserId::new("u-1");
        let mug = ProductId::new("p-mug");

        f.carts.add_item(&guest, &mug, None, 1).await.unwrap();

        // Price changes between add and login.
        f.store
            .seed_pricing(PricingView::new(mug.clone(), "MUG-01", "Mug", usd(700), 5))
            .await;

        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();

        let cart = f.store.cart_of(&CartOwner::User(user_id)).await.unwrap();
        assert_eq!(cart.items[0].price_snapshot, usd(700));
    }

    #[tokio::test]
    async fn test_merge_drops_unpurchasable_guest_lines() {
        let f = fixture().await;
        let token = GuestToken::generate();
        let guest = CartOwner::Guest(token.clone());
        let user_id = UserId::new("u-1");
        let mug = ProductId::new("p-mug");

        f.carts.add_item(&guest, &mug, None, 3).await.unwrap();
        f.store.set_stock(&mug, None, 0).await;

        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();

        let cart = f.store.cart_of(&CartOwner::User(user_id)).await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let f = fixture().await;
        let token = GuestToken::generate();
        let guest = CartOwner::Guest(token.clone());
        let user_id = UserId::new("u-1");
        let user = CartOwner::User(user_id.clone());

        f.carts
            .add_item(&guest, &ProductId::new("p-mug"), None, 2)
            .await
            .unwrap();

        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();
        let after_once = f.store.cart_of(&user).await.unwrap();

        // Second merge finds no guest record and must be a no-op, not
        // an error.
        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();
        let after_twice = f.store.cart_of(&user).await.unwrap();

        assert_eq!(after_once.items, after_twice.items);
    }

    #[tokio::test]
    async fn test_merge_carries_wishlist_union() {
        let f = fixture().await;
        let token = GuestToken::generate();
        let guest = CartOwner::Guest(token.clone());
        let user_id = UserId::new("u-1");
        let user = CartOwner::User(user_id.clone());
        let tee = ProductId::new("p-tee");
        let mug = ProductId::new("p-mug");

        f.wishlists.toggle(&guest, &tee, None).await.unwrap();
        f.wishlists.toggle(&guest, &mug, None).await.unwrap();
        f.wishlists.toggle(&user, &tee, None).await.unwrap();

        f.identity
            .merge_guest_into_user(&token, &user_id)
            .await
            .unwrap();

        let list = f.wishlists.get(&user).await.unwrap();
        assert_eq!(list.entries.len(), 2);
        assert!(f.store.wishlist_of(&guest).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_precedence() {
        let f = fixture().await;
        let token = GuestToken::generate();

        let owner = f
            .identity
            .resolve(
                &Actor::Authenticated(UserId::new("u-1")),
                Some(token.as_str()),
            )
            .unwrap();
        assert!(owner.is_user());

        let owner = f.identity.resolve(&Actor::Anonymous, Some(token.as_str()));
        assert_eq!(owner, Some(CartOwner::Guest(token)));

        assert_eq!(f.identity.resolve(&Actor::Anonymous, Some("garbage")), None);
    }
}
