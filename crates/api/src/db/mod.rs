//! Persistence for the inventory API.
//!
//! # Schema: `inventory`
//!
//! ## Tables
//!
//! - `product` - Catalog entries with on-hand quantity (soft-deleted via `deleted_at`)
//! - `stock_transaction` - Append-only stock ledger (updates and deletes are rejected by trigger)
//! - `user_account` - Credentials, contact details and role
//!
//! # Stores
//!
//! Each entity gets a narrow async trait exposing only what the services
//! need. [`StockUnit`] is the one place where a product's quantity may be
//! written: it holds the product's row lock until it is committed or dropped.
//!
//! Two implementations exist: `PostgreSQL` ([`products`], [`transactions`],
//! [`users`]) and an in-process [`memory::MemoryStore`] used by tests and
//! local development.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p stockroom-cli -- migrate
//! ```

pub mod memory;
pub mod products;
pub mod transactions;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use stockroom_core::{Email, ProductId, Sku, TransactionId, UserId};

use crate::models::{
    NewProduct, NewTransaction, NewUser, Pagination, Product, ProductFilter, ProductPatch,
    ProfileChanges, Transaction, TransactionDetail, User,
};

pub use memory::MemoryStore;
pub use products::PgProductStore;
pub use transactions::PgTransactionStore;
pub use users::PgUserStore;

/// `lock_not_available`, raised when `lock_timeout` expires.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique sku).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store could not serve the request in time (lock wait, injected fault).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Classify a driver error raised by a write.
///
/// Unique violations become [`RepositoryError::Conflict`] carrying `what`;
/// lock timeouts become [`RepositoryError::Unavailable`].
pub(crate) fn classify(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(what.to_owned());
        }
        if db_err.code().as_deref() == Some(PG_LOCK_NOT_AVAILABLE) {
            return RepositoryError::Unavailable("timed out waiting for row lock".to_owned());
        }
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Product catalog storage. Reads only ever see active products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Insert a product. Fails with `Conflict` if an active product has the SKU.
    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError>;

    /// Filtered page ordered by id.
    async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Apply a metadata patch. Returns `None` if the product is absent.
    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Tombstone a product. Returns `false` if it was absent.
    async fn soft_delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Ledger storage. Entries are created only through a [`StockUnit`].
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Open an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn StockUnit>, RepositoryError>;

    async fn find(&self, id: TransactionId) -> Result<Option<TransactionDetail>, RepositoryError>;

    /// Newest entries first.
    async fn list(&self, page: Pagination) -> Result<Vec<TransactionDetail>, RepositoryError>;

    /// Newest entries for one product first.
    async fn list_for_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> Result<Vec<TransactionDetail>, RepositoryError>;

    async fn count_for_product(&self, product_id: ProductId) -> Result<i64, RepositoryError>;
}

/// An open unit of work over the product and ledger tables.
///
/// Dropping a unit without calling [`StockUnit::commit`] rolls back every
/// write made through it and releases its locks.
#[async_trait]
pub trait StockUnit: Send {
    /// Read an active product and hold its row lock until the unit ends.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Overwrite the on-hand quantity of a product locked by this unit.
    async fn write_quantity(&mut self, id: ProductId, quantity: i32)
    -> Result<(), RepositoryError>;

    /// Apply a metadata patch to a product locked by this unit.
    async fn write_metadata(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<(), RepositoryError>;

    /// Append a ledger entry.
    async fn record(&mut self, entry: &NewTransaction) -> Result<Transaction, RepositoryError>;

    /// Make every write visible atomically.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Credential storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the username or email is taken.
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The stored password digest.
    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// Page ordered by id.
    async fn list(&self, page: Pagination) -> Result<Vec<User>, RepositoryError>;

    /// Fails with `Conflict` if the new email belongs to someone else.
    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError>;

    async fn update_password(&self, id: UserId, digest: &str) -> Result<bool, RepositoryError>;

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;
}
