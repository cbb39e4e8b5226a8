//! Fixed-point monetary amount.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of fractional digits every amount carries.
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount with exactly two fractional digits.
///
/// Construction rounds half-up (midpoint away from zero) to the cent. There is
/// a single implicit currency. The type itself is signed so it can express a
/// reconciliation difference; aggregates keep their balances non-negative.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    /// Round half-up to the cent.
    ///
    /// Fails with `InvalidAmount` when the integer part is too large to carry
    /// two fractional digits.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        let mut value = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(MONEY_SCALE);
        if value.scale() != MONEY_SCALE {
            return Err(DomainError::invalid_amount(format!(
                "{amount} is too large to hold {MONEY_SCALE} decimal places"
            )));
        }
        if value.is_zero() {
            value.set_sign_positive(true);
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    /// Build from an integer number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    pub fn parse(input: &str) -> DomainResult<Self> {
        let amount = Decimal::from_str(input.trim())
            .map_err(|e| DomainError::invalid_amount(format!("{input:?}: {e}")))?;
        Self::new(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .ok_or_else(|| DomainError::invalid_amount(format!("{self} + {other} overflows")))
            .and_then(Money::new)
    }

    pub fn subtract(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(other.0)
            .ok_or_else(|| DomainError::invalid_amount(format!("{self} - {other} overflows")))
            .and_then(Money::new)
    }

    pub fn multiply(self, factor: u64) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(factor))
            .ok_or_else(|| DomainError::invalid_amount(format!("{self} x {factor} overflows")))
            .and_then(Money::new)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_negative()
    }

    pub fn is_less_than(&self, other: &Money) -> bool {
        self < other
    }

    pub fn is_greater_than(&self, other: &Money) -> bool {
        self > other
    }

    pub fn is_greater_than_or_equal(&self, other: &Money) -> bool {
        self >= other
    }

    /// Fail with `InvalidAmount` unless the amount is strictly positive.
    pub fn ensure_positive(self, what: &str) -> DomainResult<Money> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(DomainError::invalid_amount(format!("{what} must be positive, got {self}")))
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
