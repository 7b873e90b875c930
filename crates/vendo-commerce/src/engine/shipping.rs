//! Shipping rate resolution.

use crate::error::CommerceError;
use crate::ids::ZoneId;
use crate::money::Money;
use crate::shipping::{find_zone_for_address, quote_zone, ShippingZone, ZoneQuote};
use crate::store::ZoneStore;
use std::sync::Arc;
use tracing::debug;

/// Matches destinations to zones and prices their methods.
pub struct ShippingEngine {
    zones: Arc<dyn ZoneStore>,
}

impl ShippingEngine {
    /// Create the engine over its store.
    pub fn new(zones: Arc<dyn ZoneStore>) -> Self {
        Self { zones }
    }

    /// Rate table for a destination, or `None` when no zone (including
    /// no default) matches. `None` is "shipping unavailable", a
    /// user-facing condition rather than a fault. Passing the order
    /// subtotal applies each method's free threshold.
    pub async fn quote(
        &self,
        country: &str,
        state: Option<&str>,
        subtotal: Option<Money>,
    ) -> Result<Option<ZoneQuote>, CommerceError> {
        let zones = self.zones.all_zones().await?;
        let matched = find_zone_for_address(&zones, country, state);
        if matched.is_none() {
            debug!(country, ?state, "no shipping zone matched");
        }
        Ok(matched.map(|zone| quote_zone(zone, subtotal)))
    }

    /// Insert or update a zone definition.
    pub async fn upsert_zone(&self, zone: ShippingZone) -> Result<ZoneId, CommerceError> {
        Ok(self.zones.upsert(zone).await?)
    }

    /// Make exactly one zone the default.
    ///
    /// The only write path able to change the default flag; the store
    /// clears every other zone's flag in the same atomic update.
    pub async fn set_default_zone(&self, zone_id: &ZoneId) -> Result<(), CommerceError> {
        if !self.zones.set_default(zone_id).await? {
            return Err(CommerceError::ZoneNotFound(zone_id.to_string()));
        }
        Ok(())
    }
}
