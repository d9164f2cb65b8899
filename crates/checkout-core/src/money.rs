//! Amounts and Currencies
//!
//! Callers always speak in major units (e.g. `89.90` BRL). The gateway always
//! speaks in minor units (`8990`). [`MajorAmount::to_minor_units`] is the one
//! place where the two meet.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// Default currency of the storefront
pub const DEFAULT_CURRENCY: &str = "brl";

/// Amount in major currency units
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MajorAmount(Decimal);

impl MajorAmount {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Convert to minor units: `round(amount * 100)`, midpoint away from zero
    pub fn to_minor_units(&self) -> Result<i64> {
        let cents = (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        if cents <= Decimal::ZERO {
            return Err(CheckoutError::InvalidInput(format!(
                "amount must be positive, got {}",
                self.0
            )));
        }

        cents.to_i64().ok_or_else(|| {
            CheckoutError::InvalidInput(format!("amount {} is out of range", self.0))
        })
    }
}

impl From<Decimal> for MajorAmount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for MajorAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase three-letter ISO 4217 code
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalise a currency code
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::InvalidInput(format!(
                "currency must be a three-letter ISO code, got {code:?}"
            )));
        }
        Ok(Self(code.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(DEFAULT_CURRENCY.into())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_conversion() {
        assert_eq!(MajorAmount::new(dec!(89.90)).to_minor_units().unwrap(), 8990);
        assert_eq!(MajorAmount::new(dec!(899)).to_minor_units().unwrap(), 89900);
        assert_eq!(MajorAmount::new(dec!(0.005)).to_minor_units().unwrap(), 1);
        assert_eq!(MajorAmount::new(dec!(10.004)).to_minor_units().unwrap(), 1000);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        assert!(MajorAmount::new(dec!(0)).to_minor_units().is_err());
        assert!(MajorAmount::new(dec!(-5)).to_minor_units().is_err());
        assert!(MajorAmount::new(dec!(0.004)).to_minor_units().is_err());
    }

    #[test]
    fn test_amount_deserializes_from_json_number() {
        let amount: MajorAmount = serde_json::from_str("89.9").unwrap();
        assert_eq!(amount.to_minor_units().unwrap(), 8990);
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!(CurrencyCode::parse("BRL").unwrap().as_str(), "brl");
        assert_eq!(CurrencyCode::default().as_str(), "brl");
        assert!(CurrencyCode::parse("reais").is_err());
        assert!(CurrencyCode::parse("u$d").is_err());
    }
}
