//! Order types.
//!
//! An order is a denormalized snapshot of a finalized checkout: later
//! catalog edits never alter a placed order's record. After creation
//! the only mutable part is the status state machine, plus append-only
//! timestamps that record when it moved.

use crate::error::CommerceError;
use crate::ids::{OrderId, ProductId, VariantId, ZoneId};
use crate::money::{Currency, Money};
use crate::shipping::ShippingMethodKind;
use serde::{Deserialize, Serialize};
use vendo_identity::UserId;

/// A postal address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Address {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Address line 1.
    pub line1: String,
    /// Address line 2 (apt, suite, etc.).
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// State/province code (e.g., "CA").
    pub state: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    /// Postal/ZIP code.
    pub zip: String,
    /// Phone number.
    pub phone: Option<String>,
}

impl Address {
    /// Create a new address.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: None,
            country: country.into().to_uppercase(),
            zip: zip.into(),
            phone: None,
        }
    }

    /// Set the state/province code.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into().to_uppercase());
        self
    }

    /// Get full name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Check if the address carries everything an order needs.
    pub fn is_complete(&self) -> bool {
        !self.first_name.is_empty()
            && !self.last_name.is_empty()
            && !self.line1.is_empty()
            && !self.city.is_empty()
            && !self.country.is_empty()
            && !self.zip.is_empty()
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order placed, awaiting payment confirmation.
    #[default]
    PendingPayment,
    /// Payment confirmed, order being prepared.
    Processing,
    /// Prepared and handed to fulfillment.
    Confirmed,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
    /// Order refunded.
    Refunded,
}

impl OrderStatus {
    /// Get status as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Processing => "processing",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Position along the happy path; `None` for terminal exits.
    fn happy_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::PendingPayment => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Confirmed => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    /// Check if no transition may ever leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Check if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Whether the state machine permits moving to `next`.
    ///
    /// Forward-only along the happy path (`Confirmed` is an optional
    /// stop); `Cancelled` and `Refunded` are reachable from any
    /// pre-delivered state and, like `Delivered`, admit no exit.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        let Some(from) = self.happy_rank() else {
            return false;
        };
        match next.happy_rank() {
            Some(to) => to > from,
            // Cancelled/Refunded: any state before delivery.
            None => *self != OrderStatus::Delivered,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line item frozen into an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    /// Product ordered.
    pub product_id: ProductId,
    /// Variant, if any.
    pub variant_id: Option<VariantId>,
    /// SKU at time of order.
    pub sku: String,
    /// Product name at time of order.
    pub name: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price at time of order.
    pub unit_price: Money,
    /// `unit_price * quantity`.
    pub line_total: Money,
}

/// The shipping selection frozen into an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingCharge {
    /// Zone that priced the shipment.
    pub zone_id: ZoneId,
    /// Zone name at time of order.
    pub zone_name: String,
    /// Method selected.
    pub method: ShippingMethodKind,
    /// Price charged, thresholds already applied.
    pub price: Money,
}

/// A finalized order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-readable order number, unique per month bucket.
    pub order_number: String,
    /// Customer user ID; `None` for guest checkouts.
    pub user_id: Option<UserId>,
    /// Contact email.
    pub email: String,
    /// Random lookup code for guest orders; `None` when a user is
    /// attached.
    pub tracking_code: Option<String>,
    /// Current status.
    pub status: OrderStatus,
    /// Frozen line items.
    pub line_items: Vec<OrderLineItem>,
    /// Shipping address.
    pub shipping_address: Address,
    /// Billing address.
    pub billing_address: Address,
    /// Shipping selection and charge.
    pub shipping: ShippingCharge,
    /// Coupon code applied, if any.
    pub coupon_code: Option<String>,
    /// Payment method identifier.
    pub payment_method: String,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Discount applied.
    pub discount_total: Money,
    /// Shipping charged.
    pub shipping_total: Money,
    /// Tax charged.
    pub tax_total: Money,
    /// Amount actually charged.
    pub grand_total: Money,
    /// Order currency.
    pub currency: Currency,
    /// Additional metadata.
    pub metadata: serde_json::Value,
    /// Unix timestamp the order was placed.
    pub placed_at: i64,
    /// Unix timestamp of last status change.
    pub updated_at: i64,
    /// Unix timestamp of cancellation, if cancelled.
    pub cancelled_at: Option<i64>,
}

impl Order {
    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.line_items.iter().map(|i| i.quantity).sum()
    }

    /// Check if this was a guest checkout.
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    /// The money identity every order must satisfy.
    pub fn totals_consistent(&self) -> bool {
        let expected = self
            .subtotal
            .try_add(&self.shipping_total)
            .and_then(|m| m.try_add(&self.tax_total))
            .and_then(|m| m.try_subtract(&self.discount_total));
        match expected {
            Some(total) => total == self.grand_total && !self.grand_total.is_negative(),
            None => false,
        }
    }

    /// Move the order to `next`, enforcing the state machine.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), CommerceError> {
        if !self.status.can_transition_to(next) {
            return Err(CommerceError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        self.updated_at = current_timestamp();
        if next == OrderStatus::Cancelled {
            self.cancelled_at = Some(self.updated_at);
        }
        Ok(())
    }
}

/// The event a finalized order emits toward the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRequired {
    /// Order awaiting payment.
    pub order_id: OrderId,
    /// Amount to charge.
    pub total: Money,
    /// Currency of the charge.
    pub currency: Currency,
}

/// Month bucket an order number lives in, e.g. `VN2608`.
pub fn month_prefix(prefix: &str, timestamp: i64) -> String {
    use chrono::{DateTime, Datelike};
    let date = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
    format!("{}{:02}{:02}", prefix, date.year() % 100, date.month())
}

/// Render a full order number, e.g. `VN2608-0042`.
pub fn format_order_number(month_prefix: &str, sequence: u64) -> String {
    format!("{}-{:04}", month_prefix, sequence)
}

/// Alphabet for tracking codes: unambiguous uppercase alphanumerics.
const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a random tracking code of the given length.
pub fn generate_tracking_code(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..TRACKING_ALPHABET.len());
            TRACKING_ALPHABET[idx] as char
        })
        .collect()
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

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn order() -> Order {
        Order {
            id: OrderId::generate(),
            order_number: "VN2608-0001".to_string(),
            user_id: None,
            email: "guest@example.com".to_string(),
            tracking_code: Some("ABCD23EFGH".to_string()),
            status: OrderStatus::PendingPayment,
            line_items: vec![OrderLineItem {
                product_id: ProductId::new("p-1"),
                variant_id: None,
                sku: "SKU-1".to_string(),
                name: "Widget".to_string(),
                quantity: 2,
                unit_price: usd(2000),
                line_total: usd(4000),
            }],
            shipping_address: Address::new("Jo", "Doe", "1 Main St", "Reno", "US", "89501"),
            billing_address: Address::new("Jo", "Doe", "1 Main St", "Reno", "US", "89501"),
            shipping: ShippingCharge {
                zone_id: ZoneId::new("z-1"),
                zone_name: "Domestic US".to_string(),
                method: ShippingMethodKind::Standard,
                price: usd(499),
            },
            coupon_code: None,
            payment_method: "card".to_string(),
            subtotal: usd(4000),
            discount_total: usd(400),
            shipping_total: usd(499),
            tax_total: usd(0),
            grand_total: usd(4099),
            currency: Currency::USD,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            placed_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut o = order();
        o.transition(OrderStatus::Processing).unwrap();
        o.transition(OrderStatus::Shipped).unwrap();
        o.transition(OrderStatus::Delivered).unwrap();
        assert!(o.status.is_terminal());
    }

    #[test]
    fn test_confirmed_is_optional_stop() {
        let mut o = order();
        o.transition(OrderStatus::Processing).unwrap();
        o.transition(OrderStatus::Confirmed).unwrap();
        o.transition(OrderStatus::Shipped).unwrap();
    }

    #[test]
    fn test_no_backward_transitions() {
        let mut o = order();
        o.transition(OrderStatus::Shipped).unwrap();
        let err = o.transition(OrderStatus::Processing).unwrap_err();
        assert!(matches!(err, CommerceError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_cancel_before_delivery_only() {
        let mut o = order();
        o.transition(OrderStatus::Shipped).unwrap();
        assert!(o.status.can_cancel());
        o.transition(OrderStatus::Cancelled).unwrap();
        assert!(o.cancelled_at.is_some());

        let mut o = order();
        o.transition(OrderStatus::Delivered).unwrap();
        assert!(o.transition(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_terminal_states_admit_no_exit() {
        for terminal in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            for next in [
                OrderStatus::PendingPayment,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Refunded,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_totals_identity() {
        let o = order();
        assert!(o.totals_consistent());

        let mut broken = order();
        broken.grand_total = usd(1);
        assert!(!broken.totals_consistent());
    }

    #[test]
    fn test_month_prefix() {
        // 2026-08-07 UTC
        assert_eq!(month_prefix("VN", 1_786_752_000), "VN2608");
    }

    #[test]
    fn test_order_number_format() {
        assert_eq!(format_order_number("VN2608", 42), "VN2608-0042");
        assert_eq!(format_order_number("VN2608", 12345), "VN2608-12345");
    }

    #[test]
    fn test_tracking_code_shape() {
        let code = generate_tracking_code(10);
        assert_eq!(code.len(), 10);
        assert!(code.bytes().all(|b| TRACKING_ALPHABET.contains(&b)));
        assert_ne!(code, generate_tracking_code(10));
    }
}
