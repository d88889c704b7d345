//! Minor-unit money and the decimal-string form PayPal expects.

use crate::payments::error::{PaymentError, PaymentResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// ISO-4217 codes whose minor unit is not 2 digits.
const NON_CENT_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF", "BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND",
];

fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("static currency pattern"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    pub cent_amount: u64,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, cent_amount: u64) -> Self {
        Self {
            currency_code: currency_code.into(),
            cent_amount,
        }
    }

    /// Rejects currencies the 2-digit codec cannot represent without loss.
    pub fn ensure_two_decimal_currency(&self) -> PaymentResult<()> {
        if !currency_pattern().is_match(&self.currency_code) {
            return Err(PaymentError::MalformedAmount {
                value: self.currency_code.clone(),
                reason: "currency code must be three upper-case letters".to_string(),
            });
        }
        if NON_CENT_CURRENCIES.contains(&self.currency_code.as_str()) {
            return Err(PaymentError::MalformedAmount {
                value: self.currency_code.clone(),
                reason: "only currencies with two fraction digits are supported".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_decimal_string(&self) -> String {
        to_decimal_string(self.cent_amount)
    }
}

/// `30035` becomes `"300.35"`, `5` becomes `"0.05"`.
pub fn to_decimal_string(cent_amount: u64) -> String {
    format!("{}.{:02}", cent_amount / 100, cent_amount % 100)
}

/// Inverse of [`to_decimal_string`]. Accepts `"300.35"`, `"300.3"` (read as 300.30)
/// and `"300"`; anything signed, fractional beyond cents or non-numeric fails.
pub fn from_decimal_string(value: &str) -> PaymentResult<u64> {
    let malformed = |reason: &str| PaymentError::MalformedAmount {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let (units, cents) = match trimmed.split_once('.') {
        Some((units, cents)) => (units, cents),
        None => (trimmed, "0"),
    };

    if units.is_empty() || cents.is_empty() {
        return Err(malformed("missing digits around decimal point"));
    }
    if !units.bytes().all(|b| b.is_ascii_digit()) || !cents.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("amount must contain only digits and one decimal point"));
    }
    if cents.len() > 2 {
        return Err(malformed("more than two fraction digits"));
    }

    let units: u64 = units.parse().map_err(|_| malformed("units out of range"))?;
    let mut cent_digits: u64 = cents.parse().map_err(|_| malformed("cents out of range"))?;
    // "10.5" is ten units and fifty cents
    if cents.len() == 1 {
        cent_digits *= 10;
    }

    units
        .checked_mul(100)
        .and_then(|v| v.checked_add(cent_digits))
        .ok_or_else(|| malformed("amount out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_small_amounts_with_leading_zero() {
        assert_eq!(to_decimal_string(35), "0.35");
        assert_eq!(to_decimal_string(5), "0.05");
        assert_eq!(to_decimal_string(0), "0.00");
        assert_eq!(to_decimal_string(74600), "746.00");
    }

    #[test]
    fn round_trips_through_decimal_string() {
        for cents in [0_u64, 1, 5, 35, 99, 100, 101, 30035, 74600, 9_999_999] {
            let encoded = to_decimal_string(cents);
            assert_eq!(from_decimal_string(&encoded).unwrap(), cents, "{}", encoded);
        }
    }

    #[test]
    fn parses_provider_amount_variants() {
        assert_eq!(from_decimal_string("300.35").unwrap(), 30035);
        assert_eq!(from_decimal_string("10").unwrap(), 1000);
        assert_eq!(from_decimal_string("10.5").unwrap(), 1050);
    }

    #[test]
    fn rejects_malformed_amounts() {
        for raw in ["abc", "10.x", "-1.00", "1.005", ".50", "10.", ""] {
            let err = from_decimal_string(raw).unwrap_err();
            assert!(
                matches!(err, PaymentError::MalformedAmount { ref value, .. } if value == raw),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn currency_guard_rejects_non_cent_currencies() {
        assert!(Money::new("EUR", 100).ensure_two_decimal_currency().is_ok());
        assert!(Money::new("JPY", 100).ensure_two_decimal_currency().is_err());
        assert!(Money::new("KWD", 100).ensure_two_decimal_currency().is_err());
        assert!(Money::new("eur", 100).ensure_two_decimal_currency().is_err());
    }

    #[test]
    fn money_serializes_in_camel_case() {
        let json = serde_json::to_value(Money::new("EUR", 74600)).unwrap();
        assert_eq!(json["currencyCode"], "EUR");
        assert_eq!(json["centAmount"], 74600);
    }
}
