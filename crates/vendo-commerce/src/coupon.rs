//! Discount coupons.
//!
//! Validation is pure and side-effect free: it never touches usage
//! counts, so abandoned checkouts cost nothing. Only the order
//! finalizer records a use, and only after the order is durably
//! committed.

use crate::error::CouponError;
use crate::ids::CouponId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Value of a discount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum DiscountValue {
    /// Percentage off, in whole percent (0..=100).
    Percentage(i64),
    /// Fixed amount off.
    Fixed(Money),
}

/// A discount coupon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Code customers type. Stored uppercase; lookups are
    /// case-insensitive.
    pub code: String,
    /// What the coupon is worth.
    pub value: DiscountValue,
    /// Minimum purchase amount to qualify.
    pub min_purchase: Money,
    /// Cap on the computed discount. Meaningful for percentage coupons.
    pub max_discount: Option<Money>,
    /// Unix timestamp the coupon becomes usable.
    pub starts_at: i64,
    /// Unix timestamp the coupon stops being usable, if any.
    pub ends_at: Option<i64>,
    /// Total redemptions allowed across all users, if bounded.
    pub usage_limit: Option<i64>,
    /// Redemptions recorded so far. Incremented only when an order is
    /// finalized with this coupon, never at validation time.
    pub usage_count: i64,
    /// Redemptions allowed per user.
    pub per_user_limit: i64,
    /// Whether the coupon is switched on at all.
    pub is_active: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Coupon {
    /// Create an active percentage coupon.
    pub fn percentage(code: impl Into<String>, percent: i64) -> Self {
        Self::with_value(code, DiscountValue::Percentage(percent))
    }

    /// Create an active fixed-amount coupon.
    pub fn fixed(code: impl Into<String>, amount: Money) -> Self {
        Self::with_value(code, DiscountValue::Fixed(amount))
    }

    fn with_value(code: impl Into<String>, value: DiscountValue) -> Self {
        let now = current_timestamp();
        Self {
            id: CouponId::generate(),
            code: normalize_code(&code.into()),
            value,
            min_purchase: Money::default(),
            max_discount: None,
            starts_at: now,
            ends_at: None,
            usage_limit: None,
            usage_count: 0,
            per_user_limit: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Require a minimum purchase.
    pub fn with_min_purchase(mut self, amount: Money) -> Self {
        self.min_purchase = amount;
        self
    }

    /// Cap the computed discount.
    pub fn with_max_discount(mut self, cap: Money) -> Self {
        self.max_discount = Some(cap);
        self
    }

    /// Bound total redemptions.
    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Bound per-user redemptions.
    pub fn with_per_user_limit(mut self, limit: i64) -> Self {
        self.per_user_limit = limit;
        self
    }

    /// Delay the start date.
    pub fn starting_at(mut self, timestamp: i64) -> Self {
        self.starts_at = timestamp;
        self
    }

    /// Set an end date.
    pub fn expiring_at(mut self, timestamp: i64) -> Self {
        self.ends_at = Some(timestamp);
        self
    }

    /// Record one redemption.
    pub fn record_usage(&mut self) {
        self.usage_count += 1;
        self.updated_at = current_timestamp();
    }
}

/// Canonical form of a coupon code: trimmed, uppercase.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A coupon that passed validation, reduced to what discount
/// calculation needs. A plain value, detached from storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidatedCoupon {
    /// The validated coupon.
    pub coupon_id: CouponId,
    /// Normalized code.
    pub code: String,
    /// What it is worth.
    pub value: DiscountValue,
    /// Discount cap carried through from the coupon.
    pub max_discount: Option<Money>,
}

impl ValidatedCoupon {
    /// Discount this coupon yields on the given amount.
    pub fn discount_for(&self, amount: Money) -> Money {
        calculate_discount(&self.value, self.max_discount.as_ref(), amount)
    }
}

/// Validate a coupon against a purchase at a point in time.
///
/// `user_uses` is the caller-supplied usage history count for the
/// purchasing user; pass zero for guests, whose per-user history cannot
/// be tracked. Checks short-circuit on the first failure, in the order
/// the [`CouponError`] variants document.
pub fn validate_at(
    coupon: &Coupon,
    user_uses: i64,
    amount: Money,
    now: i64,
) -> Result<ValidatedCoupon, CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive(coupon.code.clone()));
    }
    if now < coupon.starts_at {
        return Err(CouponError::NotYetActive(coupon.code.clone()));
    }
    if let Some(ends_at) = coupon.ends_at {
        if now > ends_at {
            return Err(CouponError::Expired(coupon.code.clone()));
        }
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Err(CouponError::UsageLimitReached(coupon.code.clone()));
        }
    }
    if user_uses >= coupon.per_user_limit {
        return Err(CouponError::PerUserLimitReached(coupon.code.clone()));
    }
    if amount.amount_cents < coupon.min_purchase.amount_cents {
        return Err(CouponError::BelowMinimumPurchase {
            code: coupon.code.clone(),
            min: coupon.min_purchase,
        });
    }
    Ok(ValidatedCoupon {
        coupon_id: coupon.id.clone(),
        code: coupon.code.clone(),
        value: coupon.value,
        max_discount: coupon.max_discount,
    })
}

/// Compute the discount a value yields on an amount.
///
/// Percentage discounts floor; the optional cap applies after.
/// The result is always within `[0, amount]` — a coupon can never push
/// a total negative.
pub fn calculate_discount(
    value: &DiscountValue,
    max_discount: Option<&Money>,
    amount: Money,
) -> Money {
    let raw = match value {
        DiscountValue::Percentage(percent) => {
            let discount = amount
                .percent_floor(*percent)
                .unwrap_or_else(|| Money::zero(amount.currency));
            match max_discount {
                Some(cap) => discount.min(*cap),
                None => discount,
            }
        }
        DiscountValue::Fixed(fixed) => *fixed,
    };
    if raw.is_negative() {
        return Money::zero(amount.currency);
    }
    raw.min(amount)
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
    use crate::money::Currency;

    const NOW: i64 = 1_700_000_000;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_code_normalized_uppercase() {
        let coupon = Coupon::percentage("  save10 ", 10);
        assert_eq!(coupon.code, "SAVE10");
    }

    #[test]
    fn test_validate_happy_path() {
        let coupon = Coupon::percentage("SAVE10", 10).starting_at(NOW - 10);
        let validated = validate_at(&coupon, 0, usd(4000), NOW).unwrap();
        assert_eq!(validated.code, "SAVE10");
        assert_eq!(validated.discount_for(usd(4000)), usd(400));
    }

    #[test]
    fn test_validate_inactive() {
        let mut coupon = Coupon::percentage("SAVE10", 10).starting_at(NOW - 10);
        coupon.is_active = false;
        assert_eq!(
            validate_at(&coupon, 0, usd(4000), NOW),
            Err(CouponError::Inactive("SAVE10".to_string()))
        );
    }

    #[test]
    fn test_validate_not_yet_active() {
        let coupon = Coupon::percentage("SAVE10", 10).starting_at(NOW + 100);
        assert_eq!(
            validate_at(&coupon, 0, usd(4000), NOW),
            Err(CouponError::NotYetActive("SAVE10".to_string()))
        );
    }

    #[test]
    fn test_validate_expired() {
        let coupon = Coupon::percentage("SAVE10", 10)
            .starting_at(NOW - 100)
            .expiring_at(NOW - 10);
        assert_eq!(
            validate_at(&coupon, 0, usd(4000), NOW),
            Err(CouponError::Expired("SAVE10".to_string()))
        );
    }

    #[test]
    fn test_validate_usage_limit() {
        let mut coupon = Coupon::percentage("SAVE10", 10)
            .starting_at(NOW - 10)
            .with_usage_limit(5);
        coupon.usage_count = 5;
        assert_eq!(
            validate_at(&coupon, 0, usd(4000), NOW),
            Err(CouponError::UsageLimitReached("SAVE10".to_string()))
        );
    }

    #[test]
    fn test_validate_per_user_limit() {
        let coupon = Coupon::percentage("SAVE10", 10).starting_at(NOW - 10);
        assert_eq!(
            validate_at(&coupon, 1, usd(4000), NOW),
            Err(CouponError::PerUserLimitReached("SAVE10".to_string()))
        );
    }

    #[test]
    fn test_validate_below_minimum() {
        let coupon = Coupon::percentage("SAVE10", 10)
            .starting_at(NOW - 10)
            .with_min_purchase(usd(5000));
        assert_eq!(
            validate_at(&coupon, 0, usd(4000), NOW),
            Err(CouponError::BelowMinimumPurchase {
                code: "SAVE10".to_string(),
                min: usd(5000),
            })
        );
    }

    #[test]
    fn test_check_order_expiry_before_usage() {
        // An expired coupon that is also exhausted reports Expired:
        // date checks run before usage checks.
        let mut coupon = Coupon::percentage("SAVE10", 10)
            .starting_at(NOW - 100)
            .expiring_at(NOW - 10)
            .with_usage_limit(1);
        coupon.usage_count = 1;
        assert_eq!(
            validate_at(&coupon, 0, usd(4000), NOW),
            Err(CouponError::Expired("SAVE10".to_string()))
        );
    }

    #[test]
    fn test_percentage_discount_floors() {
        let discount = calculate_discount(&DiscountValue::Percentage(10), None, usd(4099));
        assert_eq!(discount, usd(409));
    }

    #[test]
    fn test_percentage_capped_by_max_discount() {
        let discount =
            calculate_discount(&DiscountValue::Percentage(50), Some(&usd(500)), usd(10000));
        assert_eq!(discount, usd(500));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_amount() {
        let discount = calculate_discount(&DiscountValue::Fixed(usd(9000)), None, usd(5000));
        assert_eq!(discount, usd(5000));
    }

    #[test]
    fn test_discount_bounds_hold_across_inputs() {
        let amounts = [0_i64, 1, 99, 4099, 100_000];
        let values = [
            DiscountValue::Percentage(0),
            DiscountValue::Percentage(10),
            DiscountValue::Percentage(100),
            DiscountValue::Fixed(usd(0)),
            DiscountValue::Fixed(usd(750)),
            DiscountValue::Fixed(usd(1_000_000)),
        ];
        let caps = [None, Some(usd(0)), Some(usd(300))];

        for amount in amounts {
            for value in &values {
                for cap in &caps {
                    let discount = calculate_discount(value, cap.as_ref(), usd(amount));
                    assert!(discount.amount_cents >= 0);
                    assert!(discount.amount_cents <= amount);
                }
            }
        }
    }

    #[test]
    fn test_validation_does_not_touch_usage() {
        let coupon = Coupon::percentage("SAVE10", 10).starting_at(NOW - 10);
        let before = coupon.usage_count;
        let _ = validate_at(&coupon, 0, usd(4000), NOW);
        assert_eq!(coupon.usage_count, before);
    }
}
