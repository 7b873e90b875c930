//! Shipping zones, methods, and address matching.
//!
//! A zone groups countries (and optionally states) that share one rate
//! table. Resolution walks three tiers in strict order, first match
//! wins: state-specific zone, whole-country zone, then the single
//! default zone. Within a tier, the lowest `priority` number wins and
//! ties break toward the earliest-created zone, so resolution is fully
//! deterministic for a fixed zone table.

use crate::ids::ZoneId;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The closed set of shipping methods a zone can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShippingMethodKind {
    /// Standard ground shipping.
    Standard,
    /// Expedited shipping.
    Express,
    /// Next-day shipping.
    Overnight,
    /// In-store or locker pickup.
    Pickup,
}

impl ShippingMethodKind {
    /// Get the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethodKind::Standard => "standard",
            ShippingMethodKind::Express => "express",
            ShippingMethodKind::Overnight => "overnight",
            ShippingMethodKind::Pickup => "pickup",
        }
    }

    /// Parse from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(ShippingMethodKind::Standard),
            "express" => Some(ShippingMethodKind::Express),
            "overnight" => Some(ShippingMethodKind::Overnight),
            "pickup" => Some(ShippingMethodKind::Pickup),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ShippingMethodKind::Standard => "Standard",
            ShippingMethodKind::Express => "Express",
            ShippingMethodKind::Overnight => "Overnight",
            ShippingMethodKind::Pickup => "Pickup",
        }
    }
}

impl std::fmt::Display for ShippingMethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A shipping method embedded in a zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingMethod {
    /// Which method this is.
    pub kind: ShippingMethodKind,
    /// Rate for this method within the zone.
    pub price: Money,
    /// Order subtotal at which the method becomes free.
    pub free_threshold: Option<Money>,
    /// Whether the method is currently offered.
    pub is_active: bool,
}

impl ShippingMethod {
    /// Create an active method with a flat price.
    pub fn new(kind: ShippingMethodKind, price: Money) -> Self {
        Self {
            kind,
            price,
            free_threshold: None,
            is_active: true,
        }
    }

    /// Make the method free above a subtotal.
    pub fn with_free_threshold(mut self, threshold: Money) -> Self {
        self.free_threshold = Some(threshold);
        self
    }

    /// Price after applying the free threshold against a subtotal.
    ///
    /// With no subtotal context the raw price is returned.
    pub fn effective_price(&self, subtotal: Option<Money>) -> Money {
        match (self.free_threshold, subtotal) {
            (Some(threshold), Some(subtotal))
                if subtotal.amount_cents >= threshold.amount_cents =>
            {
                Money::zero(self.price.currency)
            }
            _ => self.price,
        }
    }
}

/// A geographic shipping zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingZone {
    /// Unique zone identifier.
    pub id: ZoneId,
    /// Display name (e.g., "Domestic US").
    pub name: String,
    /// ISO 3166-1 alpha-2 country codes, uppercase. A zone with an
    /// empty set is never matched by country and is only reachable as
    /// the default fallback.
    pub countries: BTreeSet<String>,
    /// State/province codes. Empty means every state of the listed
    /// countries.
    pub states: BTreeSet<String>,
    /// Rate table.
    pub methods: Vec<ShippingMethod>,
    /// Fallback zone for addresses nothing else matches. At most one
    /// zone carries this flag.
    pub is_default: bool,
    /// Whether the zone participates in matching at all.
    pub is_active: bool,
    /// Lower number wins within a matching tier.
    pub priority: i32,
    /// Monotonic insertion sequence; the deterministic tie-break for
    /// equal priorities.
    pub created_seq: u64,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl ShippingZone {
    /// Create an active, non-default zone covering the given countries.
    pub fn new(name: impl Into<String>, countries: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: ZoneId::generate(),
            name: name.into(),
            countries: countries.into_iter().map(|c| c.to_uppercase()).collect(),
            states: BTreeSet::new(),
            methods: Vec::new(),
            is_default: false,
            is_active: true,
            priority: 0,
            created_seq: 0,
            created_at: current_timestamp(),
        }
    }

    /// Restrict the zone to specific states.
    pub fn with_states(mut self, states: impl IntoIterator<Item = String>) -> Self {
        self.states = states.into_iter().map(|s| s.to_uppercase()).collect();
        self
    }

    /// Add a method to the rate table.
    pub fn with_method(mut self, method: ShippingMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Set the matching priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether this zone lists the country at all.
    fn lists_country(&self, country: &str) -> bool {
        self.countries.contains(country)
    }

    /// Tier-1 match: country and state both listed.
    fn matches_state(&self, country: &str, state: &str) -> bool {
        self.lists_country(country) && self.states.contains(state)
    }

    /// Tier-2 match: country listed, zone covers all its states.
    fn matches_whole_country(&self, country: &str) -> bool {
        self.lists_country(country) && self.states.is_empty()
    }
}

/// One priced method inside a quote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodQuote {
    /// Which method.
    pub kind: ShippingMethodKind,
    /// Price with any free threshold already applied.
    pub price: Money,
}

/// The resolved rate table for a destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneQuote {
    /// Zone that matched.
    pub zone_id: ZoneId,
    /// Zone name, for display.
    pub zone_name: String,
    /// Active methods only, threshold-adjusted.
    pub methods: Vec<MethodQuote>,
}

impl ZoneQuote {
    /// Find a method in the quote.
    pub fn method(&self, kind: ShippingMethodKind) -> Option<&MethodQuote> {
        self.methods.iter().find(|m| m.kind == kind)
    }
}

/// Select the zone for a destination, or `None` if nothing matches.
///
/// `None` means "shipping unavailable for this address" — a user-facing
/// condition, not a fault. Inactive zones never match, including the
/// default. Should the default flag ever be corrupted onto several
/// zones, the priority/insertion ordering still yields one
/// deterministic winner.
pub fn find_zone_for_address<'a>(
    zones: &'a [ShippingZone],
    country: &str,
    state: Option<&str>,
) -> Option<&'a ShippingZone> {
    let country = country.to_uppercase();
    let state = state.map(|s| s.to_uppercase());

    let active = || zones.iter().filter(|z| z.is_active);

    if let Some(state) = &state {
        if let Some(zone) = pick(active().filter(|z| z.matches_state(&country, state))) {
            return Some(zone);
        }
    }

    if let Some(zone) = pick(active().filter(|z| z.matches_whole_country(&country))) {
        return Some(zone);
    }

    pick(active().filter(|z| z.is_default))
}

/// Lowest priority wins; ties break toward the earliest-created zone.
fn pick<'a>(candidates: impl Iterator<Item = &'a ShippingZone>) -> Option<&'a ShippingZone> {
    candidates.min_by_key(|z| (z.priority, z.created_seq))
}

/// Price a zone's active methods against an optional subtotal.
pub fn quote_zone(zone: &ShippingZone, subtotal: Option<Money>) -> ZoneQuote {
    ZoneQuote {
        zone_id: zone.id.clone(),
        zone_name: zone.name.clone(),
        methods: zone
            .methods
            .iter()
            .filter(|m| m.is_active)
            .map(|m| MethodQuote {
                kind: m.kind,
                price: m.effective_price(subtotal),
            })
            .collect(),
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
