//! Coupon validation.

use crate::coupon::{normalize_code, validate_at, ValidatedCoupon};
use crate::error::CouponError;
use crate::money::Money;
use crate::store::CouponStore;
use std::sync::Arc;
use vendo_identity::UserId;

/// Validates discount codes against a purchase. Side-effect free: usage
/// counts move only when the order finalizer commits an order.
pub struct CouponEngine {
    coupons: Arc<dyn CouponStore>,
}

impl CouponEngine {
    /// Create the engine over its store.
    pub fn new(coupons: Arc<dyn CouponStore>) -> Self {
        Self { coupons }
    }

    /// Validate a code against a purchase amount.
    ///
    /// Pass the purchasing user for the per-user limit check; guests
    /// have no trackable history and skip it.
    pub async fn validate(
        &self,
        code: &str,
        amount: Money,
        user: Option<&UserId>,
    ) -> Result<ValidatedCoupon, CouponError> {
        let coupon = self
            .coupons
            .find_by_code(code)
            .await?
            .ok_or_else(|| CouponError::NotFound(normalize_code(code)))?;

        let user_uses = match user {
            Some(user_id) => self.coupons.user_usage(&coupon.id, user_id).await?,
            None => 0,
        };

        validate_at(&coupon, user_uses, amount, current_timestamp())
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
