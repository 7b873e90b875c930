//! Stateless engines over the storage ports.
//!
//! Each engine holds shared handles to the stores it needs and exposes
//! the operations of one component. Every call takes the explicit
//! [`CartOwner`](vendo_identity::CartOwner) resolved at the request
//! boundary; nothing in here inspects ambient request state.

mod cart;
mod checkout;
mod coupon;
mod identity;
mod shipping;
mod wishlist;

pub use cart::CartEngine;
pub use checkout::{
    CheckoutConfig, CheckoutEngine, CheckoutRequest, FinalizedOrder,
};
pub use coupon::CouponEngine;
pub use identity::IdentityEngine;
pub use shipping::ShippingEngine;
pub use wishlist::WishlistEngine;
