//! Product repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use stockroom_core::{Price, ProductId, RecordState, Sku};

use super::{ProductStore, RepositoryError, classify};
use crate::models::{NewProduct, Pagination, Product, ProductFilter, ProductPatch};

/// Raw product row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let sku = Sku::parse(&row.sku).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid sku for product {}: {e}", row.id))
        })?;
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        if row.quantity < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "negative quantity for product {}",
                row.id
            )));
        }

        Ok(Self {
            id: row.id,
            name: row.name,
            sku,
            description: row.description,
            price,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
            state: RecordState::from(row.deleted_at),
        })
    }
}

/// Repository for product catalog operations.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO inventory.product (name, sku, description, price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, sku, description, price, quantity,
                      created_at, updated_at, deleted_at
            ",
        )
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "sku already exists"))?;

        row.try_into()
    }

    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, sku, description, price, quantity,
                   created_at, updated_at, deleted_at
            FROM inventory.product
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, sku, description, price, quantity,
                   created_at, updated_at, deleted_at
            FROM inventory.product
            WHERE sku = $1 AND deleted_at IS NULL
            ",
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, sku, description, price, quantity,
                   created_at, updated_at, deleted_at
            FROM inventory.product
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR sku = $1)
              AND ($2::text IS NULL OR name ILIKE $2 ESCAPE '\')
              AND ($3::numeric IS NULL OR price >= $3)
              AND ($4::numeric IS NULL OR price <= $4)
            ORDER BY id
            LIMIT $5 OFFSET $6
            ",
        )
        .bind(filter.sku.as_deref())
        .bind(filter.name_pattern())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE inventory.product
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, sku, description, price, quantity,
                      created_at, updated_at, deleted_at
            ",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn soft_delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE inventory.product
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
