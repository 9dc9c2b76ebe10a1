//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::db::{
    MemoryStore, PgProductStore, PgTransactionStore, PgUserStore, ProductStore, TransactionStore,
    UserStore,
};
use crate::services::{AuthService, CatalogService, LedgerService, Passwords, TokenIssuer};

/// The three stores behind the services.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    ///
    /// `lock_timeout` bounds how long a stock adjustment waits for a product row.
    #[must_use]
    pub fn postgres(pool: &PgPool, lock_timeout: Duration) -> Self {
        Self {
            products: Arc::new(PgProductStore::new(pool.clone())),
            transactions: Arc::new(PgTransactionStore::new(pool.clone(), lock_timeout)),
            users: Arc::new(PgUserStore::new(pool.clone())),
        }
    }

    /// In-process stores backed by one [`MemoryStore`].
    #[must_use]
    pub fn in_memory(store: MemoryStore) -> Self {
        let shared = Arc::new(store);
        Self {
            products: shared.clone(),
            transactions: shared.clone(),
            users: shared,
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Services are built per request
/// from the references it hands out.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
    tokens: TokenIssuer,
    passwords: Passwords,
    allow_admin_signup: bool,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `stores` - Persistence backends
    /// * `tokens` - Bearer token issuer
    /// * `passwords` - Password hasher
    /// * `allow_admin_signup` - Whether anonymous callers may register admins
    #[must_use]
    pub fn new(
        stores: Stores,
        tokens: TokenIssuer,
        passwords: Passwords,
        allow_admin_signup: bool,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                stores,
                tokens,
                passwords,
                allow_admin_signup,
            }),
        }
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductStore {
        self.inner.stores.products.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    #[must_use]
    pub fn allow_admin_signup(&self) -> bool {
        self.inner.allow_admin_signup
    }

    /// Product catalog service.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.inner.stores.products.as_ref())
    }

    /// Stock ledger service.
    #[must_use]
    pub fn ledger(&self) -> LedgerService<'_> {
        LedgerService::new(
            self.inner.stores.products.as_ref(),
            self.inner.stores.transactions.as_ref(),
        )
    }

    /// Authentication service.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.inner.stores.users.as_ref(),
            &self.inner.passwords,
            &self.inner.tokens,
        )
    }
}
