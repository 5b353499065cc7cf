use std::{fmt::Display, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits held by the store's money columns, i.e. `Decimal(10,2)`.
pub const STORE_MONEY_SCALE: u32 = 2;
/// Total number of digits held by the store's money columns.
const STORE_MONEY_PRECISION: u32 = 10;

//--------------------------------------       Money        ---------------------------------------------------------
/// A fixed-point monetary amount. Amounts are never routed through binary floating point.
///
/// The full precision of the source string is kept in memory. Rounding to [`STORE_MONEY_SCALE`] places only happens
/// when the value crosses the store boundary (see [`Money::to_store_mantissa`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyConversionError {
    #[error("'{0}' is not a valid decimal amount")]
    InvalidAmount(String),
    #[error("{0} does not fit in a Decimal(10,2) column")]
    OutOfRange(Money),
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.store_rounded())
    }
}

impl Money {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Builds an amount from an integer number of hundredths, e.g. `from_cents(19_900)` is `199.00`.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, STORE_MONEY_SCALE))
    }

    /// Parses a decimal string such as `"199.00"` or `"-5"`. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, MoneyConversionError> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed).map(Self).map_err(|_| MoneyConversionError::InvalidAmount(s.to_string()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    fn store_rounded(&self) -> Decimal {
        let mut rounded = self.0.round_dp_with_strategy(STORE_MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(STORE_MONEY_SCALE);
        rounded
    }

    /// True if the amount, once rounded to two places, fits in a `Decimal(10,2)` column.
    pub fn fits_store_precision(&self) -> bool {
        let limit = Decimal::from(10i64.pow(STORE_MONEY_PRECISION - STORE_MONEY_SCALE));
        self.store_rounded().abs() < limit
    }

    /// The integer mantissa of this amount at two decimal places. This is the wire representation of a
    /// `Decimal(10,2)` value, e.g. `199.005` becomes `19901`.
    pub fn to_store_mantissa(&self) -> Result<i64, MoneyConversionError> {
        if !self.fits_store_precision() {
            return Err(MoneyConversionError::OutOfRange(*self));
        }
        i64::try_from(self.store_rounded().mantissa()).map_err(|_| MoneyConversionError::OutOfRange(*self))
    }
}
