//! Wishlist types.
//!
//! The cart's structurally identical, simpler sibling: same ownership
//! and guest-merge story, but membership is a plain set with no
//! quantities or price snapshots.

use crate::ids::{ProductId, VariantId, WishlistId};
use serde::{Deserialize, Serialize};
use vendo_identity::CartOwner;

/// One saved item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WishlistEntry {
    /// Saved product.
    pub product_id: ProductId,
    /// Variant, if a specific one was saved.
    pub variant_id: Option<VariantId>,
    /// Unix timestamp the entry was added.
    pub added_at: i64,
}

impl WishlistEntry {
    fn matches(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        &self.product_id == product_id && self.variant_id.as_ref() == variant_id
    }
}

/// A wishlist, owned by exactly one identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wishlist {
    /// Unique wishlist identifier.
    pub id: WishlistId,
    /// Storage key of the owning identity.
    pub owner_key: String,
    /// Saved entries; no two share a `(product, variant)` key.
    pub entries: Vec<WishlistEntry>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Wishlist {
    /// Create an empty wishlist for an owner.
    pub fn new(owner: &CartOwner) -> Self {
        let now = current_timestamp();
        Self {
            id: WishlistId::generate(),
            owner_key: owner.storage_key(),
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check membership.
    pub fn contains(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        self.entries
            .iter()
            .any(|e| e.matches(product_id, variant_id))
    }

    /// Toggle membership. Returns `true` if the key is now present.
    pub fn toggle(&mut self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        self.updated_at = current_timestamp();
        if self.contains(product_id, variant_id) {
            self.entries.retain(|e| !e.matches(product_id, variant_id));
            return false;
        }
        self.entries.push(WishlistEntry {
            product_id: product_id.clone(),
            variant_id: variant_id.cloned(),
            added_at: current_timestamp(),
        });
        true
    }

    /// Union another wishlist's entries into this one (guest merge).
    pub fn union(&mut self, other: &Wishlist) {
        for entry in &other.entries {
            if !self.contains(&entry.product_id, entry.variant_id.as_ref()) {
                self.entries.push(entry.clone());
            }
        }
        self.updated_at = current_timestamp();
    }

    /// Check if the wishlist has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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

    fn wishlist() -> Wishlist {
        Wishlist::new(&CartOwner::guest(GuestToken::generate()))
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut list = wishlist();
        let p = ProductId::new("p-1");

        assert!(list.toggle(&p, None));
        assert!(list.contains(&p, None));

        assert!(!list.toggle(&p, None));
        assert!(!list.contains(&p, None));
    }

    #[test]
    fn test_variant_is_part_of_key() {
        let mut list = wishlist();
        let p = ProductId::new("p-1");
        let v = VariantId::new("v-1");

        list.toggle(&p, None);
        list.toggle(&p, Some(&v));

        assert_eq!(list.entries.len(), 2);
    }

    #[test]
    fn test_union_deduplicates() {
        let mut user = wishlist();
        let p1 = ProductId::new("p-1");
        let p2 = ProductId::new("p-2");
        user.toggle(&p1, None);

        let mut guest = wishlist();
        guest.toggle(&p1, None);
        guest.toggle(&p2, None);

        user.union(&guest);

        assert_eq!(user.entries.len(), 2);
        assert!(user.contains(&p1, None));
        assert!(user.contains(&p2, None));
    }

    #[test]
    fn test_union_is_idempotent() {
        let mut user = wishlist();
        let mut guest = wishlist();
        guest.toggle(&ProductId::new("p-1"), None);

        user.union(&guest);
        let after_once = user.entries.clone();
        user.union(&guest);

        assert_eq!(user.entries, after_once);
    }
}
