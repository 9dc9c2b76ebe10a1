//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10,2)`, so a [`Price`] is a non-negative
//! decimal with at most two fractional digits and eight integer digits.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    #[error("price cannot be negative")]
    Negative,
    #[error("price must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum number of fractional digits.
        max: u32,
    },
    #[error("price must not exceed {max}")]
    TooLarge {
        /// Largest storable price.
        max: Decimal,
    },
}

/// A non-negative monetary amount in the store's single currency.
///
/// ```
/// use rust_decimal::Decimal;
/// use stockroom_core::Price;
///
/// let price = Price::new(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.to_string(), "19.99");
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// assert!(Price::new(Decimal::new(1, 3)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Fractional digits kept by the store.
    pub const SCALE: u32 = 2;

    /// Largest value a `NUMERIC(10,2)` column can hold.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Validate and wrap a decimal amount.
    ///
    /// Trailing zeros are insignificant: `19.990` is accepted as `19.99`.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the amount is negative, has more than two
    /// significant decimal places, or exceeds [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        let amount = amount.normalize();
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.scale() > Self::SCALE {
            return Err(PriceError::TooPrecise { max: Self::SCALE });
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        let mut amount = amount.abs();
        amount.rescale(Self::SCALE);
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_accepts_two_decimal_places() {
        assert_eq!(Price::new(dec("19.99")).unwrap().amount(), dec("19.99"));
        assert_eq!(Price::new(dec("5")).unwrap().to_string(), "5.00");
        assert_eq!(Price::new(dec("19.990")).unwrap().to_string(), "19.99");
    }

    #[test]
    fn test_zero_is_allowed() {
        let zero = Price::new(Decimal::ZERO).unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Price::ZERO);
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        assert_eq!(Price::new(dec("-0.01")), Err(PriceError::Negative));
        assert_eq!(
            Price::new(dec("1.001")),
            Err(PriceError::TooPrecise { max: 2 })
        );
        assert!(matches!(
            Price::new(dec("100000000.00")),
            Err(PriceError::TooLarge { .. })
        ));
        assert!(Price::new(dec("99999999.99")).is_ok());
    }

    #[test]
    fn test_max_matches_numeric_10_2() {
        assert_eq!(Price::MAX, dec("99999999.99"));
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_str: Price = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Price = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"12.50\"");
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
