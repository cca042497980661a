//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Floating-point percentage.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a new [`Percent`] by checking the provided values is
    /// greater than `0` and less than `100`.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        if val < Decimal::ZERO || val > Decimal::ONE_HUNDRED {
            None
        } else {
            #[expect(
                clippy::allow_attributes,
                reason = "TODO: Remove once clippy is fixed"
            )]
            #[allow(unsafe_code, reason = "invariants checked already")]
            Some(unsafe { Self::new_unchecked(val) })
        }
    }

    /// Creates a new [`Percent`] without performing any validation.
    ///
    /// # Safety
    ///
    /// The provided value must be greater than `0` and less than `100`.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(val: Decimal) -> Self {
        Self(val)
    }

    /// Returns this [`Percent`] of the provided `amount`.
    #[must_use]
    pub fn of(&self, amount: Decimal) -> Decimal {
        amount * self.0 / Decimal::ONE_HUNDRED
    }

    /// Returns the complementary [`Percent`], so both sum up to `100`.
    #[must_use]
    pub fn complement(&self) -> Self {
        Self(Decimal::ONE_HUNDRED - self.0)
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Percent;

    #[test]
    fn from_str() {
        assert!(Percent::from_str("0").is_ok());
        assert!(Percent::from_str("12.5").is_ok());
        assert!(Percent::from_str("100").is_ok());

        assert!(Percent::from_str("-1").is_err());
        assert!(Percent::from_str("100.01").is_err());
        assert!(Percent::from_str("ten").is_err());
    }

    #[test]
    fn applies_to_amount() {
        let fee = Percent::from_str("10").unwrap();

        assert_eq!(fee.of(Decimal::from(500)), Decimal::from(50));
        assert_eq!(fee.complement().of(Decimal::from(500)), Decimal::from(450));
    }
}
