//! Request actor resolution.
//!
//! The auth layer hands us an opaque actor; this module turns it, plus
//! whatever guest token the client sent, into a [`CartOwner`].

use crate::owner::{CartOwner, UserId};
use crate::token::GuestToken;
use serde::{Deserialize, Serialize};

/// The actor behind an inbound request, as reported by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// An authenticated user.
    Authenticated(UserId),
    /// No authenticated user.
    Anonymous,
}

impl Actor {
    /// Check if this actor is authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Resolve a request's actor to a cart owner.
///
/// An authenticated session always wins over any guest token. An
/// anonymous actor with a well-formed guest token resolves to that
/// guest. A malformed or absent token resolves to `None`: no identity
/// yet, and a fresh token is minted on the next mutation. Never an
/// error.
pub fn resolve(actor: &Actor, guest_token: Option<&str>) -> Option<CartOwner> {
    match actor {
        Actor::Authenticated(user_id) => Some(CartOwner::User(user_id.clone())),
        Actor::Anonymous => guest_token
            .and_then(|raw| GuestToken::parse(raw).ok())
            .map(CartOwner::Guest),
    }
}
