//! Commerce consistency core for Vendo.
//!
//! Everything a storefront needs to keep customer-facing money honest:
//!
//! - **Cart**: one mutable cart per owner, deduplicated line items,
//!   price snapshots captured at mutation time
//! - **Wishlist**: the cart's simpler sibling, set membership only
//! - **Shipping**: geographic zones with deterministic address matching
//! - **Coupons**: time- and usage-gated discount codes
//! - **Orders**: immutable finalized snapshots with unique numbers
//!
//! The engines in [`engine`] are stateless services over the storage
//! ports in [`store`]; every call takes an explicit
//! [`CartOwner`](vendo_identity::CartOwner) resolved once at the request
//! boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use vendo_commerce::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let carts = CartEngine::new(store.clone(), store.clone());
//!
//! let owner = CartOwner::guest(GuestToken::generate());
//! carts.add_item(&owner, &ProductId::new("p-1"), None, 2).await?;
//! let view = carts.get_cart(&owner).await?;
//! println!("subtotal: {}", view.subtotal);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod order;
pub mod shipping;
pub mod wishlist;

pub mod engine;
pub mod store;

pub use error::{CommerceError, CouponError, FinalizeError};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, CouponError, FinalizeError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Identity
    pub use vendo_identity::{Actor, CartOwner, GuestToken, UserId};

    // Catalog
    pub use crate::catalog::{PricingView, StockIssue};

    // Cart and wishlist
    pub use crate::cart::{Cart, CartLineItem, CartView, CartViewLine, MAX_QUANTITY_PER_ITEM};
    pub use crate::wishlist::Wishlist;

    // Shipping
    pub use crate::shipping::{
        MethodQuote, ShippingMethod, ShippingMethodKind, ShippingZone, ZoneQuote,
    };

    // Coupons
    pub use crate::coupon::{Coupon, DiscountValue, ValidatedCoupon};

    // Orders
    pub use crate::order::{
        Address, Order, OrderLineItem, OrderStatus, PaymentRequired, ShippingCharge,
    };

    // Engines
    pub use crate::engine::{
        CartEngine, CheckoutConfig, CheckoutEngine, CheckoutRequest, CouponEngine,
        FinalizedOrder, IdentityEngine, ShippingEngine, WishlistEngine,
    };

    // Storage
    pub use crate::store::memory::MemoryStore;
    pub use crate::store::{
        CartStore, CatalogStore, CommitOutcome, CouponRedemption, CouponStore, InventoryDelta,
        OrderStore, StoreError, WishlistStore, ZoneStore,
    };
}
