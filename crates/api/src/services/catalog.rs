//! Product catalog service.
//!
//! Owns product creation, metadata edits, soft deletion and filtered
//! listing. It never touches `quantity` after creation; stock movements go
//! through [`super::ledger::LedgerService`].

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use stockroom_core::{Price, ProductId, Sku};

use crate::db::{ProductStore, RepositoryError};
use crate::models::{NewProduct, Pagination, Product, ProductFilter, ProductPatch};

/// Maximum product name length in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    NotFound,

    #[error("a product with sku {0} already exists")]
    DuplicateSku(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    /// Opening stock; defaults to zero.
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Metadata fields to change. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl ProductUpdate {
    /// Validate the present fields into a store patch. An explicit zero
    /// price is honored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if a present field is invalid.
    pub fn into_patch(self) -> Result<ProductPatch, CatalogError> {
        Ok(ProductPatch {
            name: self.name.as_deref().map(validate_name).transpose()?,
            description: self.description,
            price: self.price.map(parse_price).transpose()?,
        })
    }
}

/// Product catalog operations.
pub struct CatalogService<'a> {
    products: &'a dyn ProductStore,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore) -> Self {
        Self { products }
    }

    /// Create a product.
    ///
    /// The SKU is checked up front; two concurrent creates with the same SKU
    /// are still caught by the store's uniqueness constraint.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if any field fails validation.
    /// Returns `CatalogError::DuplicateSku` if an active product has the SKU.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let name = validate_name(&input.name)?;
        let sku = Sku::parse(&input.sku).map_err(|e| CatalogError::InvalidArgument(e.to_string()))?;
        let price = parse_price(input.price)?;
        if price.is_zero() {
            return Err(CatalogError::InvalidArgument(
                "price must be greater than 0".to_owned(),
            ));
        }
        let quantity = input.quantity.unwrap_or(0);
        if quantity < 0 {
            return Err(CatalogError::InvalidArgument(
                "quantity cannot be negative".to_owned(),
            ));
        }

        if self.products.find_by_sku(&sku).await?.is_some() {
            return Err(CatalogError::DuplicateSku(sku.to_string()));
        }

        let new_product = NewProduct {
            name,
            sku,
            description: input.description.unwrap_or_default(),
            price,
            quantity,
        };
        let product = self
            .products
            .insert(&new_product)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    CatalogError::DuplicateSku(new_product.sku.to_string())
                }
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is absent or deleted.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products.find(id).await?.ok_or(CatalogError::NotFound)
    }

    /// Get an active product by SKU.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no active product has the SKU.
    pub async fn get_by_sku(&self, sku: &str) -> Result<Product, CatalogError> {
        let Ok(sku) = Sku::parse(sku) else {
            return Err(CatalogError::NotFound);
        };
        self.products
            .find_by_sku(&sku)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// List active products matching every predicate in `filter`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, CatalogError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
            && min > max
        {
            return Ok(Vec::new());
        }
        Ok(self.products.list(filter, page).await?)
    }

    /// Apply a metadata update. An explicit zero price is honored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if a present field is invalid.
    /// Returns `CatalogError::NotFound` if the product is absent or deleted.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, CatalogError> {
        let patch = update.into_patch()?;
        if patch.is_empty() {
            return self.get(id).await;
        }

        self.products
            .update(id, &patch)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Soft-delete a product. Its ledger history stays readable.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is absent or already deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.products.soft_delete(id).await? {
            return Err(CatalogError::NotFound);
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "name cannot be empty".to_owned(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CatalogError::InvalidArgument(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

fn parse_price(amount: Decimal) -> Result<Price, CatalogError> {
    Price::new(amount).map_err(|e| CatalogError::InvalidArgument(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::db::MemoryStore;

    fn input(sku: &str, price: &str) -> ProductInput {
        ProductInput {
            name: format!("Product {sku}"),
            sku: sku.to_owned(),
            description: Some("test product".to_owned()),
            price: Decimal::from_str(price).unwrap(),
            quantity: Some(10),
        }
    }

    #[tokio::test]
    async fn test_get_after_create_returns_input() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let created = catalog.create(input("WIDGET-1", "19.99")).await.unwrap();
        let fetched = catalog.get(created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Product WIDGET-1");
        assert_eq!(fetched.sku.as_str(), "WIDGET-1");
        assert_eq!(fetched.description, "test product");
        assert_eq!(fetched.price.amount(), Decimal::from_str("19.99").unwrap());
        assert_eq!(fetched.quantity, 10);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        catalog.create(input("DUP-1", "1.00")).await.unwrap();
        let err = catalog.create(input("DUP-1", "2.00")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSku(sku) if sku == "DUP-1"));
    }

    #[tokio::test]
    async fn test_sku_reusable_after_delete() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let first = catalog.create(input("REUSE-1", "1.00")).await.unwrap();
        catalog.delete(first.id).await.unwrap();
        let second = catalog.create(input("REUSE-1", "1.00")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let zero_price = catalog.create(input("P-0", "0")).await;
        assert!(matches!(zero_price, Err(CatalogError::InvalidArgument(_))));

        let mut negative_qty = input("Q-1", "1.00");
        negative_qty.quantity = Some(-1);
        assert!(matches!(
            catalog.create(negative_qty).await,
            Err(CatalogError::InvalidArgument(_))
        ));

        let mut blank_name = input("N-1", "1.00");
        blank_name.name = "   ".to_owned();
        assert!(matches!(
            catalog.create(blank_name).await,
            Err(CatalogError::InvalidArgument(_))
        ));

        assert!(matches!(
            catalog.create(input("bad sku", "1.00")).await,
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_update_applies_only_present_fields() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let created = catalog.create(input("UPD-1", "5.00")).await.unwrap();

        let updated = catalog
            .update(
                created.id,
                ProductUpdate {
                    price: Some(Decimal::ZERO),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.price.is_zero());
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.quantity, created.quantity);
    }

    #[tokio::test]
    async fn test_update_and_get_deleted_product_not_found() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let created = catalog.create(input("DEL-1", "5.00")).await.unwrap();
        catalog.delete(created.id).await.unwrap();

        assert!(matches!(catalog.get(created.id).await, Err(CatalogError::NotFound)));
        assert!(matches!(
            catalog.delete(created.id).await,
            Err(CatalogError::NotFound)
        ));
        let rename = ProductUpdate {
            name: Some("New".to_owned()),
            ..ProductUpdate::default()
        };
        assert!(matches!(
            catalog.update(created.id, rename).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            catalog.get_by_sku("DEL-1").await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_price_range_filter_matches_exact_set() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        for (sku, price) in [("A", "5.00"), ("B", "10.00"), ("C", "25.50"), ("D", "50.00"), ("E", "50.01")] {
            catalog.create(input(sku, price)).await.unwrap();
        }
        let deleted = catalog.create(input("F", "20.00")).await.unwrap();
        catalog.delete(deleted.id).await.unwrap();

        let filter = ProductFilter::new(
            None,
            None,
            Some(Decimal::from(10)),
            Some(Decimal::from(50)),
        );
        let skus: Vec<String> = catalog
            .list(&filter, Pagination::new(Some(100), None))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.sku.to_string())
            .collect();
        assert_eq!(skus, vec!["B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_empty_filter_equals_no_filter() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        for sku in ["A", "B", "C"] {
            catalog.create(input(sku, "1.00")).await.unwrap();
        }

        let page = Pagination::default();
        let unfiltered = catalog.list(&ProductFilter::default(), page).await.unwrap();
        let blank = ProductFilter::new(Some(String::new()), Some(String::new()), None, None);
        assert_eq!(catalog.list(&blank, page).await.unwrap(), unfiltered);
        assert_eq!(unfiltered.len(), 3);
    }

    #[tokio::test]
    async fn test_inverted_price_range_is_empty() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.create(input("A", "20.00")).await.unwrap();

        let filter = ProductFilter::new(None, None, Some(Decimal::from(50)), Some(Decimal::from(10)));
        assert!(catalog.list(&filter, Pagination::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_windows() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        for i in 0..15 {
            catalog.create(input(&format!("PG-{i}"), "1.00")).await.unwrap();
        }

        let filter = ProductFilter::default();
        assert_eq!(catalog.list(&filter, Pagination::default()).await.unwrap().len(), 10);
        assert_eq!(
            catalog
                .list(&filter, Pagination::new(Some(10), Some(10)))
                .await
                .unwrap()
                .len(),
            5
        );
    }
}
