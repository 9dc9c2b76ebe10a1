//! Stock ledger repository backed by `PostgreSQL`.
//!
//! A [`PgStockUnit`] wraps one database transaction. The product row is read
//! with `SELECT ... FOR UPDATE`, so concurrent adjustments of the same product
//! queue behind each other; `lock_timeout` bounds how long they queue.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};

use stockroom_core::{ProductId, TransactionId, TransactionType};

use super::products::ProductRow;
use super::{RepositoryError, StockUnit, TransactionStore, classify};
use crate::models::{
    NewTransaction, Pagination, Product, ProductPatch, Transaction, TransactionDetail,
};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: TransactionId,
    product_id: ProductId,
    quantity: i32,
    transaction_type: TransactionType,
    notes: String,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            transaction_type: row.transaction_type,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// Ledger entry joined with its product.
#[derive(Debug, sqlx::FromRow)]
struct DetailRow {
    id: TransactionId,
    product_id: ProductId,
    quantity: i32,
    transaction_type: TransactionType,
    notes: String,
    created_at: DateTime<Utc>,
    product_name: String,
    product_sku: String,
    product_description: String,
    product_price: Decimal,
    product_quantity: i32,
    product_created_at: DateTime<Utc>,
    product_updated_at: DateTime<Utc>,
    product_deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DetailRow> for TransactionDetail {
    type Error = RepositoryError;

    fn try_from(row: DetailRow) -> Result<Self, Self::Error> {
        let product = Product::try_from(ProductRow {
            id: row.product_id,
            name: row.product_name,
            sku: row.product_sku,
            description: row.product_description,
            price: row.product_price,
            quantity: row.product_quantity,
            created_at: row.product_created_at,
            updated_at: row.product_updated_at,
            deleted_at: row.product_deleted_at,
        })?;

        Ok(Self {
            transaction: Transaction {
                id: row.id,
                product_id: row.product_id,
                quantity: row.quantity,
                transaction_type: row.transaction_type,
                notes: row.notes,
                created_at: row.created_at,
            },
            product,
        })
    }
}

/// Repository for stock ledger operations.
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgTransactionStore {
    /// Create a new ledger repository.
    ///
    /// `lock_timeout` caps how long a unit of work waits for a product row.
    #[must_use]
    pub const fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn begin(&self) -> Result<Box<dyn StockUnit>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Scoped to this transaction only
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgStockUnit { tx }))
    }

    async fn find(&self, id: TransactionId) -> Result<Option<TransactionDetail>, RepositoryError> {
        sqlx::query_as::<_, DetailRow>(
            r"
            SELECT t.id, t.product_id, t.quantity, t.transaction_type, t.notes, t.created_at,
                   p.name AS product_name, p.sku AS product_sku,
                   p.description AS product_description, p.price AS product_price,
                   p.quantity AS product_quantity, p.created_at AS product_created_at,
                   p.updated_at AS product_updated_at, p.deleted_at AS product_deleted_at
            FROM inventory.stock_transaction t
            JOIN inventory.product p ON p.id = t.product_id
            WHERE t.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TransactionDetail::try_from)
        .transpose()
    }

    async fn list(&self, page: Pagination) -> Result<Vec<TransactionDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, DetailRow>(
            r"
            SELECT t.id, t.product_id, t.quantity, t.transaction_type, t.notes, t.created_at,
                   p.name AS product_name, p.sku AS product_sku,
                   p.description AS product_description, p.price AS product_price,
                   p.quantity AS product_quantity, p.created_at AS product_created_at,
                   p.updated_at AS product_updated_at, p.deleted_at AS product_deleted_at
            FROM inventory.stock_transaction t
            JOIN inventory.product p ON p.id = t.product_id
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionDetail::try_from).collect()
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> Result<Vec<TransactionDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, DetailRow>(
            r"
            SELECT t.id, t.product_id, t.quantity, t.transaction_type, t.notes, t.created_at,
                   p.name AS product_name, p.sku AS product_sku,
                   p.description AS product_description, p.price AS product_price,
                   p.quantity AS product_quantity, p.created_at AS product_created_at,
                   p.updated_at AS product_updated_at, p.deleted_at AS product_deleted_at
            FROM inventory.stock_transaction t
            JOIN inventory.product p ON p.id = t.product_id
            WHERE t.product_id = $1
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(product_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionDetail::try_from).collect()
    }

    async fn count_for_product(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory.stock_transaction WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// One open database transaction.
///
/// `sqlx::Transaction` rolls back on drop, which gives [`StockUnit`] its
/// abort-on-drop behavior.
pub struct PgStockUnit {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StockUnit for PgStockUnit {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, sku, description, price, quantity,
                   created_at, updated_at, deleted_at
            FROM inventory.product
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "product row"))?
        .map(Product::try_from)
        .transpose()
    }

    async fn write_quantity(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE inventory.product
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "product row"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn write_metadata(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE inventory.product
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "product row"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record(&mut self, entry: &NewTransaction) -> Result<Transaction, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r"
            INSERT INTO inventory.stock_transaction (product_id, quantity, transaction_type, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, quantity, transaction_type, notes, created_at
            ",
        )
        .bind(entry.product_id)
        .bind(entry.quantity)
        .bind(entry.transaction_type)
        .bind(&entry.notes)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
