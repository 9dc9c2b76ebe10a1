//! Stock ledger service.
//!
//! Every change to a product's on-hand quantity goes through here. One
//! adjustment is one unit of work:
//!
//! 1. lock the product row
//! 2. compute the new quantity ([`TransactionType::apply`])
//! 3. write the quantity and append the ledger entry
//! 4. commit
//!
//! Any failure before the commit drops the unit, which rolls back both
//! writes. Nothing is retried.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use stockroom_core::{ProductId, StockError, TransactionId, TransactionType};

use crate::db::{ProductStore, RepositoryError, StockUnit, TransactionStore};
use crate::models::{
    NewTransaction, Pagination, Product, ProductPatch, Transaction, TransactionDetail,
};

/// Maximum length of transaction notes in characters.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Notes attached to ledger entries created by a direct quantity edit.
pub const CORRECTION_NOTE: &str = "manual stock correction";

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("product not found")]
    ProductNotFound,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<StockError> for LedgerError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient {
                available,
                requested,
            } => Self::InsufficientStock {
                available,
                requested,
            },
            StockError::NonPositive(_) | StockError::Overflow => {
                Self::InvalidArgument(err.to_string())
            }
        }
    }
}

/// A requested stock movement.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub quantity: i32,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Stock ledger operations.
pub struct LedgerService<'a> {
    products: &'a dyn ProductStore,
    transactions: &'a dyn TransactionStore,
}

impl<'a> LedgerService<'a> {
    /// Create a new ledger service.
    #[must_use]
    pub const fn new(
        products: &'a dyn ProductStore,
        transactions: &'a dyn TransactionStore,
    ) -> Self {
        Self {
            products,
            transactions,
        }
    }

    /// Apply a stock movement and record it.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the quantity is not positive (checked before
    ///   any store access) or the notes are too long
    /// - `ProductNotFound` if the product is absent or deleted
    /// - `InsufficientStock` if an `OUT` exceeds the on-hand quantity
    /// - `Storage` for store faults; nothing is written in that case
    #[instrument(
        skip(self, adjustment),
        fields(
            product_id = %adjustment.product_id,
            kind = %adjustment.transaction_type,
            quantity = adjustment.quantity,
        )
    )]
    pub async fn adjust_stock(
        &self,
        adjustment: StockAdjustment,
    ) -> Result<TransactionDetail, LedgerError> {
        if adjustment.quantity <= 0 {
            return Err(LedgerError::InvalidArgument(
                "quantity must be greater than 0".to_owned(),
            ));
        }
        let notes = normalize_notes(adjustment.notes)?;

        let mut unit = self.transactions.begin().await?;
        let product = unit
            .lock_product(adjustment.product_id)
            .await?
            .ok_or(LedgerError::ProductNotFound)?;

        let next = match adjustment
            .transaction_type
            .apply(product.quantity, adjustment.quantity)
        {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(on_hand = product.quantity, error = %err, "Stock adjustment rejected");
                return Err(err.into());
            }
        };

        let recorded = stage_movement(
            unit.as_mut(),
            &product,
            adjustment.transaction_type,
            adjustment.quantity,
            next,
            notes,
        )
        .await?;
        unit.commit().await?;

        Ok(committed(product, recorded, next))
    }

    /// Bring a product's quantity to `target` through the ledger.
    ///
    /// Records one `IN` or `OUT` entry for the difference, or nothing when
    /// the quantity already equals `target`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `target` is negative, `ProductNotFound`
    /// if the product is absent or deleted, and `Storage` for store faults.
    #[instrument(skip(self, notes))]
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        target: i32,
        notes: Option<String>,
    ) -> Result<Option<TransactionDetail>, LedgerError> {
        if target < 0 {
            return Err(LedgerError::InvalidArgument(
                "quantity cannot be negative".to_owned(),
            ));
        }
        let notes = normalize_notes(notes.or_else(|| Some(CORRECTION_NOTE.to_owned())))?;

        let mut unit = self.transactions.begin().await?;
        let product = unit
            .lock_product(product_id)
            .await?
            .ok_or(LedgerError::ProductNotFound)?;

        let Some((kind, quantity)) = TransactionType::between(product.quantity, target) else {
            return Ok(None);
        };

        let recorded =
            stage_movement(unit.as_mut(), &product, kind, quantity, target, notes).await?;
        unit.commit().await?;

        Ok(Some(committed(product, recorded, target)))
    }

    /// Apply a metadata patch and, when `target` is given, bring the
    /// quantity to it. Both happen in one unit of work: either every change
    /// is committed or none is.
    ///
    /// A quantity change is recorded the way [`Self::set_quantity`] records
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `target` is negative, `ProductNotFound`
    /// if the product is absent or deleted, and `Storage` for store faults.
    #[instrument(skip(self, patch))]
    pub async fn revise_product(
        &self,
        product_id: ProductId,
        patch: &ProductPatch,
        target: Option<i32>,
    ) -> Result<Product, LedgerError> {
        if target.is_some_and(|t| t < 0) {
            return Err(LedgerError::InvalidArgument(
                "quantity cannot be negative".to_owned(),
            ));
        }

        let mut unit = self.transactions.begin().await?;
        let product = unit
            .lock_product(product_id)
            .await?
            .ok_or(LedgerError::ProductNotFound)?;

        let movement = target.and_then(|target| {
            TransactionType::between(product.quantity, target)
                .map(|(kind, quantity)| (kind, quantity, target))
        });
        if patch.is_empty() && movement.is_none() {
            return Ok(product);
        }

        let mut revised = product.clone();
        if !patch.is_empty() {
            unit.write_metadata(product_id, patch).await?;
            patch.apply_to(&mut revised);
        }
        let recorded = match movement {
            Some((kind, quantity, next)) => {
                let notes = CORRECTION_NOTE.to_owned();
                let recorded =
                    stage_movement(unit.as_mut(), &product, kind, quantity, next, notes).await?;
                Some((recorded, next))
            }
            None => None,
        };
        unit.commit().await?;

        revised.updated_at = Utc::now();
        if let Some((recorded, next)) = recorded {
            revised = committed(revised, recorded, next).product;
        }
        tracing::info!(product_id = %product_id, "Product updated");
        Ok(revised)
    }

    /// Get a ledger entry with its product.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::TransactionNotFound` if there is no such entry.
    pub async fn get(&self, id: TransactionId) -> Result<TransactionDetail, LedgerError> {
        self.transactions
            .find(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)
    }

    /// List ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the store fails.
    pub async fn list(&self, page: Pagination) -> Result<Vec<TransactionDetail>, LedgerError> {
        Ok(self.transactions.list(page).await?)
    }

    /// List one product's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ProductNotFound` if the product is absent or deleted.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> Result<Vec<TransactionDetail>, LedgerError> {
        if self.products.find(product_id).await?.is_none() {
            return Err(LedgerError::ProductNotFound);
        }
        Ok(self.transactions.list_for_product(product_id, page).await?)
    }

    /// Number of ledger entries recorded for a product.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the store fails.
    pub async fn history_count(&self, product_id: ProductId) -> Result<i64, LedgerError> {
        Ok(self.transactions.count_for_product(product_id).await?)
    }
}

/// Write the new quantity and append the ledger entry inside `unit`.
async fn stage_movement(
    unit: &mut dyn StockUnit,
    product: &Product,
    kind: TransactionType,
    quantity: i32,
    next: i32,
    notes: String,
) -> Result<Transaction, LedgerError> {
    unit.write_quantity(product.id, next).await?;
    Ok(unit
        .record(&NewTransaction {
            product_id: product.id,
            quantity,
            transaction_type: kind,
            notes,
        })
        .await?)
}

/// Describe a committed movement from what the unit saw and wrote. Does not
/// touch the store.
fn committed(mut product: Product, recorded: Transaction, next: i32) -> TransactionDetail {
    tracing::info!(
        product_id = %product.id,
        transaction_id = %recorded.id,
        kind = %recorded.transaction_type,
        quantity = recorded.quantity,
        old_quantity = product.quantity,
        new_quantity = next,
        "Stock adjusted"
    );

    product.quantity = next;
    product.updated_at = recorded.created_at;
    TransactionDetail {
        transaction: recorded,
        product,
    }
}

fn normalize_notes(notes: Option<String>) -> Result<String, LedgerError> {
    let notes = notes.map(|n| n.trim().to_owned()).unwrap_or_default();
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(LedgerError::InvalidArgument(format!(
            "notes must be at most {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(notes)
}
