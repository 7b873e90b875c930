//! Order finalization.
//!
//! The one place where everything the customer saw gets re-derived from
//! authoritative state: stock is re-checked for real, shipping is
//! re-resolved from the final address, the coupon is re-validated
//! against the fresh subtotal, and the whole result is committed as a
//! single atomic unit.

use crate::catalog::check_stock_authoritative;
use crate::coupon::ValidatedCoupon;
use crate::engine::CouponEngine;
use crate::error::{CommerceError, CouponError, FinalizeError};
use crate::ids::OrderId;
use crate::money::{Currency, Money};
use crate::order::{
    format_order_number, generate_tracking_code, month_prefix, Address, Order, OrderLineItem,
    OrderStatus, PaymentRequired, ShippingCharge,
};
use crate::shipping::{find_zone_for_address, quote_zone, ShippingMethodKind};
use crate::store::{
    CartStore, CatalogStore, CommitOutcome, CouponRedemption, CouponStore, InventoryDelta,
    OrderStore, ZoneStore,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vendo_identity::CartOwner;

/// Tunables for order finalization.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Prefix on every order number (e.g. `VN2608-0001`).
    pub order_prefix: String,
    /// Length of guest tracking codes.
    pub tracking_code_len: usize,
    /// How many identifier collisions to absorb before giving up.
    pub max_commit_retries: u32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            order_prefix: "VN".to_string(),
            tracking_code_len: 10,
            max_commit_retries: 5,
        }
    }
}

impl CheckoutConfig {
    /// Set the order number prefix.
    pub fn with_order_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_prefix = prefix.into();
        self
    }

    /// Set the tracking code length.
    pub fn with_tracking_code_len(mut self, len: usize) -> Self {
        self.tracking_code_len = len;
        self
    }
}

/// Everything the caller supplies to finalize a checkout.
///
/// Deliberately free of prices: subtotal, shipping cost, and discount
/// are all re-derived server-side. Tax arrives pre-computed from the
/// external tax collaborator.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Contact email for the order.
    pub email: String,
    /// Destination address; shipping is resolved from this, nothing
    /// client-supplied.
    pub shipping_address: Address,
    /// Billing address; `None` means same as shipping.
    pub billing_address: Option<Address>,
    /// Which of the zone's methods to use.
    pub shipping_method: ShippingMethodKind,
    /// Optional discount code.
    pub coupon_code: Option<String>,
    /// Payment method identifier, passed through to the order.
    pub payment_method: String,
    /// Tax on this order, computed by the external tax collaborator.
    pub tax_amount: Money,
}

/// A committed order plus the event for the payment gateway.
#[derive(Debug, Clone)]
pub struct FinalizedOrder {
    /// The persisted order.
    pub order: Order,
    /// Outbound `payment required` event.
    pub payment: PaymentRequired,
}

/// Turns a cart, an address, and an optional coupon into an immutable
/// order.
pub struct CheckoutEngine {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
    zones: Arc<dyn ZoneStore>,
    orders: Arc<dyn OrderStore>,
    coupons: CouponEngine,
    config: CheckoutConfig,
}

impl CheckoutEngine {
    /// Create the engine over its stores.
    pub fn new(
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogStore>,
        zones: Arc<dyn ZoneStore>,
        coupons: Arc<dyn CouponStore>,
        orders: Arc<dyn OrderStore>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            carts,
            catalog,
            zones,
            orders,
            coupons: CouponEngine::new(coupons),
            config,
        }
    }

    /// Finalize the owner's cart into an order.
    ///
    /// On success the order row, the coupon usage increment, and the
    /// inventory decrements were applied as one unit; on any error,
    /// none of them were.
    pub async fn finalize(
        &self,
        owner: &CartOwner,
        request: CheckoutRequest,
    ) -> Result<FinalizedOrder, FinalizeError> {
        let cart = self
            .carts
            .find(owner)
            .await?
            .ok_or(FinalizeError::EmptyCart)?;

        // Step 1: authoritative stock re-check, gathering every
        // offending line before rejecting. Lines invisible to the cart
        // view (inactive/missing products) are skipped, not ordered.
        let currency = Currency::default();
        let mut lines = Vec::with_capacity(cart.items.len());
        let mut issues = Vec::new();
        for item in &cart.items {
            let Some(view) = self
                .catalog
                .pricing_view(&item.product_id, item.variant_id.as_ref())
                .await?
            else {
                continue;
            };
            if !view.is_active {
                continue;
            }
            if let Some(issue) = check_stock_authoritative(&view, item.quantity) {
                issues.push(issue);
                continue;
            }
            let unit_price = view.effective_unit_price();
            let line_total = unit_price
                .try_multiply(item.quantity)
                .ok_or(FinalizeError::Overflow)?;
            lines.push(OrderLineItem {
                product_id: item.product_id.clone(),
                variant_id: item.variant_id.clone(),
                sku: view.sku,
                name: view.name,
                quantity: item.quantity,
                unit_price,
                line_total,
            });
        }
        if !issues.is_empty() {
            warn!(count = issues.len(), "checkout rejected: stock changed");
            return Err(FinalizeError::StockChanged(issues));
        }
        if lines.is_empty() {
            return Err(FinalizeError::EmptyCart);
        }

        let subtotal = Money::try_sum(lines.iter().map(|l| &l.line_total), currency)
            .ok_or(FinalizeError::Overflow)?;

        // Step 2: re-resolve shipping from the finalized address.
        let country = request.shipping_address.country.clone();
        let state = request.shipping_address.state.clone();
        let zones = self.zones.all_zones().await?;
        let zone = find_zone_for_address(&zones, &country, state.as_deref()).ok_or(
            FinalizeError::ShippingUnavailable {
                country: country.clone(),
                state: state.clone(),
            },
        )?;
        let quote = quote_zone(zone, Some(subtotal));
        let method = quote.method(request.shipping_method).ok_or_else(|| {
            FinalizeError::ShippingMethodUnavailable(request.shipping_method.to_string())
        })?;
        let shipping = ShippingCharge {
            zone_id: quote.zone_id.clone(),
            zone_name: quote.zone_name.clone(),
            method: method.kind,
            price: method.price,
        };

        // Step 3: re-validate the coupon against the fresh subtotal. A
        // coupon that no longer validates degrades to zero discount;
        // the order still goes through.
        let validated = match &request.coupon_code {
            Some(code) => self.revalidate_coupon(code, subtotal, owner).await?,
            None => None,
        };
        let discount_total = validated
            .as_ref()
            .map(|v| v.discount_for(subtotal))
            .unwrap_or_else(|| Money::zero(currency));

        // Step 4: totals. The discount clamp makes a negative total
        // unreachable; assert it anyway.
        let grand_total = subtotal
            .try_add(&shipping.price)
            .and_then(|m| m.try_add(&request.tax_amount))
            .and_then(|m| m.try_subtract(&discount_total))
            .ok_or(FinalizeError::Overflow)?;
        if grand_total.is_negative() {
            error!(
                subtotal = subtotal.amount_cents,
                discount = discount_total.amount_cents,
                "negative order total computed; this is a defect"
            );
            return Err(FinalizeError::InvalidTotal);
        }

        let redemption = validated.as_ref().map(|v| CouponRedemption {
            coupon_id: v.coupon_id.clone(),
            user_id: owner.user_id().cloned(),
        });
        let inventory: Vec<InventoryDelta> = lines
            .iter()
            .map(|l| InventoryDelta {
                product_id: l.product_id.clone(),
                variant_id: l.variant_id.clone(),
                quantity: l.quantity,
            })
            .collect();

        // Steps 5-7: unique identifiers and the atomic commit.
        // Collisions are retried internally, never surfaced.
        let now = current_timestamp();
        let bucket = month_prefix(&self.config.order_prefix, now);
        let mut tracking_code = owner
            .is_guest()
            .then(|| generate_tracking_code(self.config.tracking_code_len));

        for attempt in 1..=self.config.max_commit_retries {
            let sequence = self.orders.month_sequence(&bucket).await? + 1;
            let order = Order {
                id: OrderId::generate(),
                order_number: format_order_number(&bucket, sequence),
                user_id: owner.user_id().cloned(),
                email: request.email.clone(),
                tracking_code: tracking_code.clone(),
                status: OrderStatus::PendingPayment,
                line_items: lines.clone(),
                shipping_address: request.shipping_address.clone(),
                billing_address: request
                    .billing_address
                    .clone()
                    .unwrap_or_else(|| request.shipping_address.clone()),
                shipping: shipping.clone(),
                coupon_code: validated.as_ref().map(|v| v.code.clone()),
                payment_method: request.payment_method.clone(),
                subtotal,
                discount_total,
                shipping_total: shipping.price,
                tax_total: request.tax_amount,
                grand_total,
                currency,
                metadata: serde_json::Value::Object(serde_json::Map::new()),
                placed_at: now,
                updated_at: now,
                cancelled_at: None,
            };

            match self
                .orders
                .commit_finalized(order.clone(), redemption.clone(), inventory.clone())
                .await?
            {
                CommitOutcome::Committed => {
                    info!(
                        order_number = %order.order_number,
                        total = order.grand_total.amount_cents,
                        "order finalized"
                    );
                    let payment = PaymentRequired {
                        order_id: order.id.clone(),
                        total: order.grand_total,
                        currency,
                    };
                    return Ok(FinalizedOrder { order, payment });
                }
                CommitOutcome::DuplicateOrderNumber => {
                    warn!(attempt, bucket = %bucket, "order number collision; recounting");
                }
                CommitOutcome::DuplicateTrackingCode => {
                    warn!(attempt, "tracking code collision; regenerating");
                    tracking_code =
                        Some(generate_tracking_code(self.config.tracking_code_len));
                }
            }
        }

        Err(FinalizeError::CommitContention(
            self.config.max_commit_retries,
        ))
    }

    /// Advance an order's status, enforcing the state machine.
    pub async fn advance_status(
        &self,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Result<Order, CommerceError> {
        let mut order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))?;
        order.transition(next)?;
        self.orders.save(order.clone()).await?;
        Ok(order)
    }

    /// Cancel an order, if its status still allows it.
    pub async fn cancel(&self, order_id: &OrderId) -> Result<Order, CommerceError> {
        self.advance_status(order_id, OrderStatus::Cancelled).await
    }

    /// Refund an order, if its status still allows it.
    pub async fn refund(&self, order_id: &OrderId) -> Result<Order, CommerceError> {
        self.advance_status(order_id, OrderStatus::Refunded).await
    }

    /// Guest order lookup by tracking code.
    pub async fn find_by_tracking_code(
        &self,
        code: &str,
    ) -> Result<Option<Order>, CommerceError> {
        Ok(self.orders.find_by_tracking_code(code).await?)
    }

    /// Coupon re-validation with the degrade-to-zero policy. Store
    /// faults still abort the checkout.
    async fn revalidate_coupon(
        &self,
        code: &str,
        subtotal: Money,
        owner: &CartOwner,
    ) -> Result<Option<ValidatedCoupon>, FinalizeError> {
        match self.coupons.validate(code, subtotal, owner.user_id()).await {
            Ok(validated) => Ok(Some(validated)),
            Err(CouponError::Store(e)) => Err(FinalizeError::Store(e)),
            Err(err) => {
                debug!(%err, "coupon rejected at checkout; proceeding without discount");
                Ok(None)
            }
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
