//! Product catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{Price, ProductId, RecordState, Sku};

/// A product with its authoritative on-hand quantity.
///
/// `quantity` is written only by the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Stock keeping unit, unique among active products.
    pub sku: Sku,
    /// Free-form description (empty when not provided).
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units on hand, never negative.
    pub quantity: i32,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete lifecycle.
    #[serde(skip)]
    pub state: RecordState,
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: Sku,
    pub description: String,
    pub price: Price,
    /// Opening stock level.
    pub quantity: i32,
}

/// Metadata changes for an existing product.
///
/// Fields left as `None` are untouched. There is deliberately no quantity
/// field here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
}

impl ProductPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }

    /// Apply the patch to a product in place.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
    }
}

/// Listing predicates, combined with AND.
///
/// Every predicate is optional; the default filter matches all active
/// products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact, case-sensitive SKU.
    pub sku: Option<String>,
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Build a filter, treating blank strings as absent.
    #[must_use]
    pub fn new(
        sku: Option<String>,
        name: Option<String>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
    ) -> Self {
        let non_blank = |s: Option<String>| {
            s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };
        Self {
            sku: non_blank(sku),
            name: non_blank(name),
            min_price,
            max_price,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// Evaluate the filter against a product.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.price.amount();
        self.sku
            .as_deref()
            .is_none_or(|sku| product.sku.as_str() == sku)
            && self.name.as_deref().is_none_or(|name| {
                product.name.to_lowercase().contains(&name.to_lowercase())
            })
            && self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
    }

    /// `ILIKE` pattern for the name predicate with `%`, `_` and `\` escaped.
    #[must_use]
    pub fn name_pattern(&self) -> Option<String> {
        self.name.as_deref().map(|name| {
            let mut pattern = String::with_capacity(name.len() + 2);
            pattern.push('%');
            for c in name.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }
}
