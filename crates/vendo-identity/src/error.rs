//! Identity errors.

use thiserror::Error;

/// Identity error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Guest token is not a well-formed opaque token.
    #[error("malformed guest token")]
    MalformedToken,

    /// Guest session expired.
    #[error("guest session expired")]
    SessionExpired,
}
