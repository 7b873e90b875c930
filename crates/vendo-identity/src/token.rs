//! Guest session tokens.
//!
//! A guest is identified by an opaque random token the client carries
//! (cookie or header). The token is generated once, server state keyed by
//! it lives for 30 days, and the lifetime rolls forward on activity.

use crate::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Guest session lifetime: 30 days, rolling.
pub const GUEST_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Raw entropy per token, before encoding.
const TOKEN_BYTES: usize = 24;

/// Minimum encoded length that can still carry 16 bytes of entropy.
const MIN_TOKEN_LEN: usize = 22;

/// An opaque guest session token.
///
/// 24 random bytes, URL-safe base64 without padding (32 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestToken(String);

impl GuestToken {
    /// Generate a new random token.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parse a client-supplied token string.
    ///
    /// Rejects anything too short to carry 16 bytes of entropy or
    /// containing characters outside the URL-safe base64 alphabet. A
    /// rejected token means "no guest identity", never a panic.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        if raw.len() < MIN_TOKEN_LEN {
            return Err(IdentityError::MalformedToken);
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(IdentityError::MalformedToken);
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side state for a guest session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSession {
    /// The client-held token.
    pub token: GuestToken,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp when the session expires.
    pub expires_at: i64,
}

impl GuestSession {
    /// Start a new guest session with a fresh token.
    pub fn start() -> Self {
        let now = current_timestamp();
        Self {
            token: GuestToken::generate(),
            created_at: now,
            expires_at: now + GUEST_SESSION_TTL_SECS,
        }
    }

    /// Check if the session is expired.
    pub fn is_expired(&self) -> bool {
        current_timestamp() > self.expires_at
    }

    /// Roll the lifetime forward from now.
    pub fn touch(&mut self) {
        self.expires_at = current_timestamp() + GUEST_SESSION_TTL_SECS;
    }

    /// Validate the session, returning an error if expired.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.is_expired() {
            Err(IdentityError::SessionExpired)
        } else {
            Ok(())
        }
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
