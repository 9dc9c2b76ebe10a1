//! Product route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::ProductId;

use super::{JsonBody, PathParam, QueryParams};
use crate::error::{AppError, Result};
use crate::middleware::{Guard, RequireAuth, authorize};
use crate::models::{Pagination, Product, ProductFilter};
use crate::services::catalog::{ProductInput, ProductUpdate};
use crate::state::AppState;

/// Listing filters plus paging.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated product listing.
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub limit: i64,
    pub offset: i64,
}

/// Body of `PUT /products/{id}`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// Routed through the stock ledger as a correction entry.
    pub quantity: Option<i32>,
}

/// List active products.
pub async fn index(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListProductsQuery>,
) -> Result<Json<ProductList>> {
    let filter = ProductFilter::new(query.sku, query.name, query.min_price, query.max_price);
    let page = Pagination::new(query.limit, query.offset);

    let products = state.catalog().list(&filter, page).await?;

    Ok(Json(ProductList {
        products,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// Create a product.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Show one active product.
pub async fn show(
    State(state): State<AppState>,
    PathParam(id): PathParam<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get(id).await?))
}

/// Update product metadata and, if present, its quantity.
///
/// A quantity change is recorded as an `IN`/`OUT` ledger entry. Metadata
/// and quantity are committed together or not at all.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    PathParam(id): PathParam<ProductId>,
    JsonBody(body): JsonBody<UpdateProductRequest>,
) -> Result<Json<Product>> {
    if body.quantity.is_some_and(|q| q < 0) {
        return Err(AppError::BadRequest(
            "quantity cannot be negative".to_owned(),
        ));
    }

    let patch = ProductUpdate {
        name: body.name,
        description: body.description,
        price: body.price,
    }
    .into_patch()?;

    let product = state
        .ledger()
        .revise_product(id, &patch, body.quantity)
        .await?;
    Ok(Json(product))
}

/// Soft-delete a product. Admin only.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<ProductId>,
) -> Result<StatusCode> {
    authorize(Some(&claims), &[Guard::Admin])?;
    state.catalog().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
