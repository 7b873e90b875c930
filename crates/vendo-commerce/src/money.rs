//! Money type for representing monetary values.
//!
//! Cents-based integer representation; every arithmetic path the
//! engines use is checked, so a corrupt quantity or price can surface
//! as a typed overflow instead of wrapping silently.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl Currency {
    /// Get the currency code (e.g., "USD").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
        }
    }

    /// Get the currency symbol (e.g., "$").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::CAD => "CA$",
            Currency::AUD => "A$",
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Amounts are stored in the smallest unit of the currency (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in cents.
    pub amount_cents: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from cents.
    pub fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    /// Check if this is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_cents < 0
    }

    /// Format as a display string (e.g., "$49.99").
    pub fn display(&self) -> String {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency.symbol(),
            abs / 100,
            abs % 100
        )
    }

    /// Add another Money value, checking currency and overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        let amount = self.amount_cents.checked_add(other.amount_cents)?;
        Some(Money::new(amount, self.currency))
    }

    /// Subtract another Money value, checking currency and overflow.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        let amount = self.amount_cents.checked_sub(other.amount_cents)?;
        Some(Money::new(amount, self.currency))
    }

    /// Multiply by a scalar, checking overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        let amount = self.amount_cents.checked_mul(factor)?;
        Some(Money::new(amount, self.currency))
    }

    /// Integer percentage, rounded toward zero (floor for non-negative
    /// amounts).
    pub fn percent_floor(&self, percent: i64) -> Option<Money> {
        let scaled = self.amount_cents.checked_mul(percent)?;
        Some(Money::new(scaled / 100, self.currency))
    }

    /// The smaller of two amounts in the same currency.
    pub fn min(self, other: Money) -> Money {
        if self.amount_cents <= other.amount_cents {
            self
        } else {
            other
        }
    }

    /// Sum an iterator of Money values, checking currency and overflow.
    pub fn try_sum<'a>(
        iter: impl Iterator<Item = &'a Money>,
        currency: Currency,
    ) -> Option<Money> {
        let mut total = Money::zero(currency);
        for m in iter {
            total = total.try_add(m)?;
        }
        Some(total)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let m = Money::new(4999, Currency::USD);
        assert_eq!(m.amount_cents, 4999);
        assert_eq!(m.currency, Currency::USD);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999, Currency::USD).display(), "$49.99");
        assert_eq!(Money::new(5, Currency::USD).display(), "$0.05");
        assert_eq!(Money::new(-250, Currency::EUR).display(), "-\u{20ac}2.50");
    }

    #[test]
    fn test_try_add() {
        let a = Money::new(1000, Currency::USD);
        let b = Money::new(500, Currency::USD);
        assert_eq!(a.try_add(&b).unwrap().amount_cents, 1500);
    }

    #[test]
    fn test_currency_mismatch_is_none() {
        let usd = Money::new(1000, Currency::USD);
        let eur = Money::new(1000, Currency::EUR);
        assert!(usd.try_add(&eur).is_none());
        assert!(usd.try_subtract(&eur).is_none());
    }

    #[test]
    fn test_try_multiply_overflow() {
        let m = Money::new(i64::MAX, Currency::USD);
        assert!(m.try_multiply(2).is_none());
        assert_eq!(m.try_multiply(1).unwrap().amount_cents, i64::MAX);
    }

    #[test]
    fn test_percent_floor() {
        // 10% of $40.00 is $4.00 even
        let m = Money::new(4000, Currency::USD);
        assert_eq!(m.percent_floor(10).unwrap().amount_cents, 400);

        // 10% of 4099 cents floors to 409, not 410
        let m = Money::new(4099, Currency::USD);
        assert_eq!(m.percent_floor(10).unwrap().amount_cents, 409);
    }

    #[test]
    fn test_try_sum() {
        let values = vec![
            Money::new(1000, Currency::USD),
            Money::new(2000, Currency::USD),
        ];
        let total = Money::try_sum(values.iter(), Currency::USD).unwrap();
        assert_eq!(total.amount_cents, 3000);
    }

    #[test]
    fn test_min() {
        let a = Money::new(400, Currency::USD);
        let b = Money::new(4000, Currency::USD);
        assert_eq!(a.min(b), a);
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("usd"), Some(Currency::USD));
        assert_eq!(Currency::from_code("INVALID"), None);
    }
}
