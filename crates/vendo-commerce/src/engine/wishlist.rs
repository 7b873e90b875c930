//! Wishlist operations.

use crate::error::CommerceError;
use crate::ids::{ProductId, VariantId};
use crate::store::WishlistStore;
use crate::wishlist::Wishlist;
use std::sync::Arc;
use vendo_identity::CartOwner;

/// The cart engine's simpler sibling: set membership, no quantities.
pub struct WishlistEngine {
    wishlists: Arc<dyn WishlistStore>,
}

impl WishlistEngine {
    /// Create the engine over its store.
    pub fn new(wishlists: Arc<dyn WishlistStore>) -> Self {
        Self { wishlists }
    }

    /// Read the owner's wishlist. Owners without one get an empty,
    /// unsaved list; reading never creates a record.
    pub async fn get(&self, owner: &CartOwner) -> Result<Wishlist, CommerceError> {
        Ok(self
            .wishlists
            .find(owner)
            .await?
            .unwrap_or_else(|| Wishlist::new(owner)))
    }

    /// Toggle an item's membership. Returns `true` if the item is now
    /// on the list. Creates the wishlist lazily on first use.
    pub async fn toggle(
        &self,
        owner: &CartOwner,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<bool, CommerceError> {
        let mut list = self.get(owner).await?;
        let added = list.toggle(product_id, variant_id);
        self.wishlists.upsert(list).await?;
        Ok(added)
    }

    /// Empty the wishlist. A no-op for owners without one.
    pub async fn clear(&self, owner: &CartOwner) -> Result<(), CommerceError> {
        if let Some(mut list) = self.wishlists.find(owner).await? {
            list.entries.clear();
            self.wishlists.upsert(list).await?;
        }
        Ok(())
    }
}
