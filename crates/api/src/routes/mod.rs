//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (store ping)
//!
//! # Products
//! POST   /products                    - Create product (auth)
//! GET    /products                    - List with filters (public)
//! GET    /products/{id}               - Product detail (public)
//! PUT    /products/{id}               - Partial update (auth)
//! DELETE /products/{id}               - Soft delete (admin)
//! GET    /products/{id}/transactions  - Product ledger (auth)
//!
//! # Transactions
//! POST   /transactions                - Stock adjustment (auth)
//! GET    /transactions                - Ledger, newest first (auth)
//! GET    /transactions/{id}           - Ledger entry (auth)
//!
//! # Auth
//! POST   /auth/register               - Register (public; admin role gated)
//! POST   /auth/login                  - Login, returns {token, user}
//!
//! # Users
//! GET    /users/profile               - Own profile (auth)
//! POST   /users/change-password       - Change own password (auth)
//! GET    /users                       - List users (admin)
//! GET    /users/{id}                  - User detail (owner or admin)
//! PUT    /users/{id}                  - Update profile (owner or admin; role admin only)
//! DELETE /users/{id}                  - Delete user (admin, not self)
//! ```

pub mod auth;
pub mod products;
pub mod transactions;
pub mod users;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::models::Pagination;
use crate::state::AppState;

/// `axum::Json` whose rejection is an [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` whose rejection is an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// `axum::extract::Path` whose rejection is an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// `?limit=&offset=` query parameters.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        Self::new(query.limit, query.offset)
    }
}

/// `{"message": "..."}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/{id}/transactions", get(transactions::for_product))
}

/// Create the transaction routes router.
pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(transactions::index).post(transactions::create))
        .route("/{id}", get(transactions::show))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/profile", get(users::profile))
        .route("/change-password", post(users::change_password))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
}

/// Every route except `/auth`.
///
/// The binary nests [`auth_routes`] itself so it can put a rate limiter on them.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/transactions", transaction_routes())
        .nest("/users", user_routes())
}

/// Create all routes for the API, without rate limiting.
pub fn routes() -> Router<AppState> {
    api_routes().nest("/auth", auth_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.products().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
