//! Value objects: equality by value, not identity.
//!
//! Value objects are defined entirely by their attribute values. Two `Money`
//! amounts of 1050 minor units are the same amount, wherever they came from.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Monetary amount in the smallest currency unit (grosze, cents).
///
/// The currency itself travels separately as a [`CurrencyCode`]; invoices carry a
/// single currency for all their amounts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub fn minor(&self) -> u64 {
        self.0
    }

    /// Amount multiplied by a quantity.
    pub fn times(self, quantity: u32) -> DomainResult<Money> {
        self.0
            .checked_mul(u64::from(quantity))
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Percentage share of the amount, rounded half-up to the minor unit.
    pub fn percent(self, rate: VatRate) -> DomainResult<Money> {
        let scaled = u128::from(self.0) * u128::from(rate.percent());
        let rounded = (scaled + 50) / 100;
        u64::try_from(rounded)
            .map(Money)
            .map_err(|_| DomainError::validation("amount overflow"))
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl ValueObject for Money {}

/// ISO 4217 currency code (three uppercase ASCII letters, e.g. `PLN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency code must be three uppercase letters, got {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl ValueObject for CurrencyCode {}

/// VAT rate in whole percent (0–100).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct VatRate(u8);

impl VatRate {
    pub fn new(percent: u8) -> DomainResult<Self> {
        if percent > 100 {
            return Err(DomainError::validation(format!(
                "vat rate must be within 0..=100, got {percent}"
            )));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for VatRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for VatRate {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VatRate> for u8 {
    fn from(value: VatRate) -> Self {
        value.0
    }
}

impl ValueObject for VatRate {}

/// How the invoice is to be settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    /// Label printed on documents.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "Bank transfer",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" | "transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(DomainError::validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

impl ValueObject for PaymentMethod {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_renders_with_two_decimals() {
        assert_eq!(Money::from_minor(123450).to_string(), "1234.50");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn percent_rounds_half_up() {
        let rate = VatRate::new(23).unwrap();
        // 10.50 * 23% = 2.415 -> 2.42
        assert_eq!(Money::from_minor(1050).percent(rate).unwrap(), Money::from_minor(242));
        // 0.02 * 23% = 0.0046 -> 0.00
        assert_eq!(Money::from_minor(2).percent(rate).unwrap(), Money::ZERO);
    }

    #[test]
    fn times_detects_overflow() {
        assert!(Money::from_minor(u64::MAX).times(2).is_err());
        assert_eq!(Money::from_minor(250).times(4).unwrap(), Money::from_minor(1000));
    }

    #[test]
    fn currency_code_validation() {
        assert_eq!(CurrencyCode::new("PLN").unwrap().as_str(), "PLN");
        assert!(CurrencyCode::new("pln").is_err());
        assert!(CurrencyCode::new("EURO").is_err());
        assert!(serde_json::from_str::<CurrencyCode>("\"usd\"").is_err());
    }

    #[test]
    fn vat_rate_bounds() {
        assert!(VatRate::new(101).is_err());
        assert_eq!(VatRate::new(8).unwrap().to_string(), "8%");
    }

    #[test]
    fn payment_method_parsing_accepts_labels() {
        assert_eq!("Bank transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("barter".parse::<PaymentMethod>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the rendered amount always parses back to the same minor units.
            #[test]
            fn money_display_is_lossless(minor in 0u64..10_000_000_000) {
                let rendered = Money::from_minor(minor).to_string();
                let (whole, frac) = rendered.split_once('.').unwrap();
                prop_assert_eq!(frac.len(), 2);
                let back = whole.parse::<u64>().unwrap() * 100 + frac.parse::<u64>().unwrap();
                prop_assert_eq!(back, minor);
            }

            /// Property: VAT share never exceeds the base amount.
            #[test]
            fn percent_never_exceeds_base(minor in 0u64..1_000_000_000, rate in 0u8..=100) {
                let share = Money::from_minor(minor).percent(VatRate::new(rate).unwrap()).unwrap();
                prop_assert!(share <= Money::from_minor(minor));
            }
        }
    }
}
