//! Stock ledger entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, TransactionId, TransactionType};

use super::Product;

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub product_id: ProductId,
    /// Units moved, always positive.
    pub quantity: i32,
    pub transaction_type: TransactionType,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this entry on the product's quantity.
    #[must_use]
    pub fn signed_quantity(&self) -> i64 {
        self.transaction_type.signed(self.quantity)
    }
}

/// A ledger entry about to be recorded inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub product_id: ProductId,
    pub quantity: i32,
    pub transaction_type: TransactionType,
    pub notes: String,
}

/// A ledger entry with its product resolved.
///
/// The product is resolved even when it has since been soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub product: Product,
}
