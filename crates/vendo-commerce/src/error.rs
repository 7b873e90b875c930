//! Commerce error types.
//!
//! Three taxonomies, matched to when a failure can surface: cart
//! mutation time ([`CommerceError`]), coupon validation
//! ([`CouponError`]), and order finalization ([`FinalizeError`]).
//! Validation failures are typed and user-actionable; infrastructure
//! faults flow through [`StoreError`](crate::store::StoreError).

use crate::catalog::StockIssue;
use crate::money::Money;
use crate::store::StoreError;
use thiserror::Error;

/// Errors from cart, wishlist, shipping, and order-status operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// Product missing from the catalog or no longer active.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Line item not present in the owner's cart.
    #[error("item not in cart: {0}")]
    ItemNotInCart(String),

    /// Shipping zone not found.
    #[error("shipping zone not found: {0}")]
    ZoneNotFound(String),

    /// Order not found.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Item has no stock and backorders are disallowed.
    #[error("out of stock: {sku}")]
    OutOfStock {
        /// SKU of the exhausted item.
        sku: String,
    },

    /// Requested quantity exceeds available stock (cart-mutation check).
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        /// SKU of the constrained item.
        sku: String,
        /// Quantity the mutation would have produced.
        requested: i64,
        /// Stock currently available.
        available: i64,
    },

    /// Quantity outside the acceptable range for this operation.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Order status transition not permitted by the state machine.
    #[error("invalid order status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Status the order is in.
        from: String,
        /// Status the transition requested.
        to: String,
    },

    /// Currency mismatch.
    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch {
        /// Currency the operation expected.
        expected: String,
        /// Currency it got.
        got: String,
    },

    /// Arithmetic overflow in a money calculation.
    #[error("arithmetic overflow in money calculation")]
    Overflow,

    /// Storage-layer fault; not recoverable by this core.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a coupon code was rejected.
///
/// Checks short-circuit in declaration order: existence, active flag,
/// start date, end date, global usage, per-user usage, minimum purchase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CouponError {
    /// No coupon with that code.
    #[error("coupon not found: {0}")]
    NotFound(String),

    /// Coupon exists but is switched off.
    #[error("coupon is not active: {0}")]
    Inactive(String),

    /// Coupon exists but its start date is in the future.
    #[error("coupon is not active yet: {0}")]
    NotYetActive(String),

    /// Coupon's end date has passed.
    #[error("coupon expired: {0}")]
    Expired(String),

    /// Global usage limit exhausted.
    #[error("coupon usage limit reached: {0}")]
    UsageLimitReached(String),

    /// This user already used the coupon as often as allowed.
    #[error("per-user usage limit reached for coupon: {0}")]
    PerUserLimitReached(String),

    /// Purchase amount below the coupon's minimum.
    #[error("purchase amount below minimum of {min} for coupon {code}")]
    BelowMinimumPurchase {
        /// The rejected code.
        code: String,
        /// Minimum purchase the coupon requires.
        min: Money,
    },

    /// Storage-layer fault during lookup.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why order finalization was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FinalizeError {
    /// Nothing purchasable left in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Stock can no longer satisfy the cart (checkout-time check).
    ///
    /// Carries every offending line so the caller can re-render an
    /// actionable correction.
    #[error("stock changed for: {}", format_issues(.0))]
    StockChanged(Vec<StockIssue>),

    /// No shipping zone matches the destination, including no default.
    #[error("shipping unavailable for {country}")]
    ShippingUnavailable {
        /// Destination country code.
        country: String,
        /// Destination state code, if one was given.
        state: Option<String>,
    },

    /// The matched zone does not offer the requested method.
    #[error("shipping method {0} not offered for this address")]
    ShippingMethodUnavailable(String),

    /// Totals came out negative. Unreachable by construction; logged as
    /// a defect if ever seen.
    #[error("order total would be negative")]
    InvalidTotal,

    /// Generated identifiers kept colliding past the retry budget.
    #[error("order commit conflict not resolved after {0} attempts")]
    CommitContention(u32),

    /// Arithmetic overflow computing totals.
    #[error("arithmetic overflow computing order totals")]
    Overflow,

    /// Storage-layer fault; no side effects were applied.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_issues(issues: &[StockIssue]) -> String {
    issues
        .iter()
        .map(|i| i.sku.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
