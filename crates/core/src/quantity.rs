//! Non-negative unit counts.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A non-negative integer count of units.
///
/// Bounded by `i64::MAX` so every value fits a signed 64-bit column.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl ValueObject for Quantity {}

impl Quantity {
    pub const MAX: u64 = i64::MAX as u64;

    /// A strictly positive quantity (order lines, stock additions).
    pub fn of(n: i64) -> DomainResult<Self> {
        if n <= 0 {
            return Err(DomainError::invalid_quantity(format!("quantity must be positive, got {n}")));
        }
        Ok(Self(n as u64))
    }

    /// A quantity that may be zero (stored counters).
    pub fn of_non_negative(n: i64) -> DomainResult<Self> {
        if n < 0 {
            return Err(DomainError::invalid_quantity(format!("quantity must not be negative, got {n}")));
        }
        Ok(Self(n as u64))
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Value as a signed column.
    pub fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn add(self, other: Quantity) -> DomainResult<Quantity> {
        match self.0.checked_add(other.0) {
            Some(sum) if sum <= Self::MAX => Ok(Quantity(sum)),
            _ => Err(DomainError::QuantityOverflow),
        }
    }

    /// Strict subtraction: the result must stay positive.
    pub fn subtract(self, other: Quantity) -> DomainResult<Quantity> {
        if self.0 <= other.0 {
            return Err(DomainError::invalid_quantity(format!(
                "cannot subtract {} from {}: result must stay positive",
                other.0, self.0
            )));
        }
        Ok(Quantity(self.0 - other.0))
    }

    /// Subtraction that may reach zero (stock depletion).
    pub fn deduct(self, other: Quantity) -> DomainResult<Quantity> {
        self.0
            .checked_sub(other.0)
            .map(Quantity)
            .ok_or_else(|| DomainError::invalid_quantity(format!("cannot deduct {} from {}", other.0, self.0)))
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn of_requires_positive() {
        assert!(matches!(Quantity::of(0), Err(DomainError::InvalidQuantity(_))));
        assert!(matches!(Quantity::of(-3), Err(DomainError::InvalidQuantity(_))));
        assert_eq!(Quantity::of(3).unwrap().value(), 3);
        assert!(Quantity::of_non_negative(0).unwrap().is_zero());
    }

    #[test]
    fn add_overflows_past_bound() {
        let max = Quantity::of(i64::MAX).unwrap();
        assert_eq!(max.add(Quantity::of(1).unwrap()), Err(DomainError::QuantityOverflow));
        assert_eq!(max.add(Quantity::zero()).unwrap().value(), Quantity::MAX);
    }

    #[test]
    fn subtract_is_strict_but_deduct_reaches_zero() {
        let five = Quantity::of(5).unwrap();
        assert!(five.subtract(five).is_err());
        assert_eq!(five.subtract(Quantity::of(2).unwrap()).unwrap().value(), 3);
        assert!(five.deduct(five).unwrap().is_zero());
        assert!(five.deduct(Quantity::of(6).unwrap()).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn of_round_trips(n in 1i64..=i64::MAX) {
            prop_assert_eq!(Quantity::of(n).unwrap().value(), n as u64);
        }

        #[test]
        fn add_then_deduct_is_identity(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
            let (a, b) = (Quantity::of_non_negative(a).unwrap(), Quantity::of_non_negative(b).unwrap());
            prop_assert_eq!(a.add(b).unwrap().deduct(b).unwrap(), a);
        }
    }
}
