//! Stock keeping unit identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Sku`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkuError {
    #[error("sku cannot be empty")]
    Empty,
    #[error("sku must be at most {max} characters")]
    TooLong { max: usize },
    #[error("sku may only contain letters, digits, '.', '_' and '-'")]
    InvalidCharacter,
}

/// A product SKU, unique among active products.
///
/// Surrounding whitespace is trimmed. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub const MAX_LENGTH: usize = 100;

    /// Parse a `Sku` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`SkuError`] if the trimmed input is empty, longer than
    /// [`Sku::MAX_LENGTH`], or contains characters outside `[A-Za-z0-9._-]`.
    pub fn parse(s: &str) -> Result<Self, SkuError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SkuError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(SkuError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(SkuError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Sku {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self {
        sku.0
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Sku {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Sku {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Sku {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Sku::parse("WIDGET-1").unwrap().as_str(), "WIDGET-1");
        assert_eq!(Sku::parse("  bolt_m8.zinc ").unwrap().as_str(), "bolt_m8.zinc");
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Sku::parse("   "), Err(SkuError::Empty));
        assert_eq!(Sku::parse("WIDGET 1"), Err(SkuError::InvalidCharacter));
        assert_eq!(Sku::parse("W%"), Err(SkuError::InvalidCharacter));
        assert_eq!(
            Sku::parse(&"X".repeat(101)),
            Err(SkuError::TooLong { max: 100 })
        );
        assert!(Sku::parse(&"X".repeat(100)).is_ok());
    }
}
