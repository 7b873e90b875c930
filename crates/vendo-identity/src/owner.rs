//! Cart ownership.

use crate::token::GuestToken;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The identity a cart or wishlist belongs to.
///
/// A sum type: an authenticated user account or an anonymous guest
/// session, never both at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    /// An authenticated user account.
    User(UserId),
    /// An anonymous guest session.
    Guest(GuestToken),
}

impl CartOwner {
    /// Owner for an authenticated user.
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(UserId::new(id))
    }

    /// Owner for a guest session.
    pub fn guest(token: GuestToken) -> Self {
        Self::Guest(token)
    }

    /// Check if this is a guest owner.
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    /// Check if this is an authenticated owner.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// Get the user ID, if authenticated.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::User(id) => Some(id),
            Self::Guest(_) => None,
        }
    }

    /// Stable storage key, unique across owner kinds.
    ///
    /// The kind prefix keeps a user whose ID happens to equal a guest
    /// token from ever colliding with that guest's records.
    pub fn storage_key(&self) -> String {
        match self {
            Self::User(id) => format!("user:{}", id),
            Self::Guest(token) => format!("guest:{}", token),
        }
    }
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}
