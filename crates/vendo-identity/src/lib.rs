//! Cart ownership identity for Vendo.
//!
//! Answers one question for every cart and wishlist operation: *who is
//! shopping?* Either an authenticated user or an anonymous guest session,
//! never both. The answer is resolved once at the request boundary and
//! threaded explicitly into every engine call.

mod error;
mod owner;
mod resolver;
mod token;

pub use error::IdentityError;
pub use owner::{CartOwner, UserId};
pub use resolver::{resolve, Actor};
pub use token::{GuestSession, GuestToken, GUEST_SESSION_TTL_SECS};
