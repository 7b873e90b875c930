//! Newtype IDs for type-safe identifiers.
//!
//! Newtypes keep the many string identifiers in this crate from being
//! mixed up, e.g. passing a ProductId where a VariantId is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use vendo_identity::UserId;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(generate_id())
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

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(VariantId);
define_id!(CartId);
define_id!(LineItemId);
define_id!(WishlistId);
define_id!(ZoneId);
define_id!(CouponId);
define_id!(OrderId);

/// Generate a unique ID using timestamp and process-local entropy.
fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    let ptr = Box::new(0u8);
    let addr = &*ptr as *const u8 as u64;

    format!("{:x}{:04x}", timestamp as u64 ^ addr, counter & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = ProductId::new("prod-123");
        assert_eq!(id.as_str(), "prod-123");
    }

    #[test]
    fn test_id_generation_unique() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_id_display() {
        let id = ZoneId::new("zone-us");
        assert_eq!(format!("{}", id), "zone-us");
    }

    #[test]
    fn test_id_from_str() {
        let id: CouponId = "SAVE10".into();
        assert_eq!(id.as_str(), "SAVE10");
    }
}
