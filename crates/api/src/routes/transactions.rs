//! Stock ledger route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use stockroom_core::{ProductId, TransactionId};

use super::{JsonBody, PageQuery, PathParam, QueryParams};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Pagination, TransactionDetail};
use crate::services::ledger::StockAdjustment;
use crate::state::AppState;

/// Paginated ledger listing.
#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<TransactionDetail>,
    pub limit: i64,
    pub offset: i64,
}

impl TransactionList {
    fn new(transactions: Vec<TransactionDetail>, page: Pagination) -> Self {
        Self {
            transactions,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Apply a stock adjustment.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    JsonBody(adjustment): JsonBody<StockAdjustment>,
) -> Result<(StatusCode, Json<TransactionDetail>)> {
    tracing::debug!(
        user_id = %claims.user_id,
        product_id = %adjustment.product_id,
        "Stock adjustment requested"
    );
    let detail = state.ledger().adjust_stock(adjustment).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List ledger entries, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<TransactionList>> {
    let page = Pagination::from(query);
    let transactions = state.ledger().list(page).await?;
    Ok(Json(TransactionList::new(transactions, page)))
}

/// Show one ledger entry with its product.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    PathParam(id): PathParam<TransactionId>,
) -> Result<Json<TransactionDetail>> {
    Ok(Json(state.ledger().get(id).await?))
}

/// List one product's ledger entries, newest first.
pub async fn for_product(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    PathParam(product_id): PathParam<ProductId>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<TransactionList>> {
    let page = Pagination::from(query);
    let transactions = state.ledger().list_for_product(product_id, page).await?;
    Ok(Json(TransactionList::new(transactions, page)))
}
