//! Status enums for ledger entries, users, and soft-deletable records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a stock movement.
///
/// The ledger stores the moved amount as a positive magnitude; the direction
/// lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "inventory.transaction_type", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Goods received; quantity increases.
    In,
    /// Goods issued; quantity decreases.
    Out,
}

/// Why a stock movement cannot be applied to an on-hand quantity.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockError {
    #[error("quantity must be positive, got {0}")]
    NonPositive(i32),
    #[error("insufficient stock: {available} available, {requested} requested")]
    Insufficient { available: i32, requested: i32 },
    #[error("resulting quantity exceeds the storable maximum")]
    Overflow,
}

impl TransactionType {
    /// Compute the on-hand quantity after moving `quantity` units.
    ///
    /// # Errors
    ///
    /// - [`StockError::NonPositive`] if `quantity <= 0`
    /// - [`StockError::Insufficient`] if an `Out` would go below zero
    /// - [`StockError::Overflow`] if an `In` would overflow `i32`
    pub const fn apply(self, on_hand: i32, quantity: i32) -> Result<i32, StockError> {
        if quantity <= 0 {
            return Err(StockError::NonPositive(quantity));
        }
        match self {
            Self::In => match on_hand.checked_add(quantity) {
                Some(next) => Ok(next),
                None => Err(StockError::Overflow),
            },
            Self::Out => {
                if quantity > on_hand {
                    Err(StockError::Insufficient {
                        available: on_hand,
                        requested: quantity,
                    })
                } else {
                    Ok(on_hand - quantity)
                }
            }
        }
    }

    /// Signed contribution of `quantity` units in this direction.
    #[must_use]
    pub fn signed(self, quantity: i32) -> i64 {
        match self {
            Self::In => i64::from(quantity),
            Self::Out => -i64::from(quantity),
        }
    }

    /// The movement that takes `from` to `to`, if they differ.
    ///
    /// Returns the direction and the positive magnitude.
    #[must_use]
    pub const fn between(from: i32, to: i32) -> Option<(Self, i32)> {
        if to > from {
            Some((Self::In, to - from))
        } else if to < from {
            Some((Self::Out, from - to))
        } else {
            None
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
        }
    }
}

/// Error returned when a string is not a known [`UserRole`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (must be 'admin' or 'user')")]
pub struct UnknownRole(pub String);

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "inventory.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access, including user management and product deletion.
    Admin,
    /// Catalog and stock operations on their own behalf.
    #[default]
    User,
}

impl UserRole {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

/// Lifecycle of a soft-deletable record.
///
/// Deleted records stay in the store so ledger entries keep a valid reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    #[default]
    Active,
    Deleted { deleted_at: DateTime<Utc> },
}

impl RecordState {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Deleted { deleted_at } => Some(*deleted_at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for RecordState {
    fn from(deleted_at: Option<DateTime<Utc>>) -> Self {
        deleted_at.map_or(Self::Active, |deleted_at| Self::Deleted { deleted_at })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_in_adds() {
        assert_eq!(TransactionType::In.apply(0, 5), Ok(5));
        assert_eq!(TransactionType::In.apply(70, 30), Ok(100));
    }

    #[test]
    fn test_out_subtracts_down_to_zero() {
        assert_eq!(TransactionType::Out.apply(100, 30), Ok(70));
        assert_eq!(TransactionType::Out.apply(70, 70), Ok(0));
    }

    #[test]
    fn test_out_never_goes_negative() {
        assert_eq!(
            TransactionType::Out.apply(70, 80),
            Err(StockError::Insufficient {
                available: 70,
                requested: 80
            })
        );
        assert_eq!(
            TransactionType::Out.apply(0, 1),
            Err(StockError::Insufficient {
                available: 0,
                requested: 1
            })
        );
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert_eq!(
            TransactionType::In.apply(10, 0),
            Err(StockError::NonPositive(0))
        );
        assert_eq!(
            TransactionType::Out.apply(10, -5),
            Err(StockError::NonPositive(-5))
        );
    }

    #[test]
    fn test_in_overflow_rejected() {
        assert_eq!(
            TransactionType::In.apply(i32::MAX, 1),
            Err(StockError::Overflow)
        );
    }

    #[test]
    fn test_any_sequence_stays_non_negative_and_replays() {
        let moves = [
            (TransactionType::In, 10),
            (TransactionType::Out, 25),
            (TransactionType::Out, 7),
            (TransactionType::In, 3),
            (TransactionType::Out, 99),
            (TransactionType::Out, 9),
        ];
        let start = 20;
        let mut on_hand = start;
        let mut applied = 0_i64;
        for (kind, qty) in moves {
            if let Ok(next) = kind.apply(on_hand, qty) {
                on_hand = next;
                applied += kind.signed(qty);
            }
            assert!(on_hand >= 0);
        }
        assert_eq!(i64::from(start) + applied, i64::from(on_hand));
    }

    #[test]
    fn test_between() {
        assert_eq!(
            TransactionType::between(10, 15),
            Some((TransactionType::In, 5))
        );
        assert_eq!(
            TransactionType::between(10, 4),
            Some((TransactionType::Out, 6))
        );
        assert_eq!(TransactionType::between(10, 10), None);
    }

    #[test]
    fn test_transaction_type_serde() {
        assert_eq!(
            serde_json::to_string(&TransactionType::Out).unwrap(),
            "\"OUT\""
        );
        let parsed: TransactionType = serde_json::from_str("\"IN\"").unwrap();
        assert_eq!(parsed, TransactionType::In);
        assert!(serde_json::from_str::<TransactionType>("\"in\"").is_err());
    }

    #[test]
    fn test_user_role_parse() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!("user".parse::<UserRole>(), Ok(UserRole::User));
        assert_eq!(
            "root".parse::<UserRole>(),
            Err(UnknownRole("root".to_owned()))
        );
        assert_eq!(UserRole::default(), UserRole::User);
        assert!(UserRole::Admin.is_admin());
    }

    #[test]
    fn test_record_state_from_timestamp() {
        assert_eq!(RecordState::from(None), RecordState::Active);
        let now = Utc::now();
        let state = RecordState::from(Some(now));
        assert!(!state.is_active());
        assert_eq!(state.deleted_at(), Some(now));
    }
}
