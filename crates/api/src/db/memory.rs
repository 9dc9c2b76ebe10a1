//! In-process store implementing every repository trait.
//!
//! Used by the test suites and for running the API without a database.
//! It keeps the same guarantees the services rely on from `PostgreSQL`:
//!
//! - each product has its own async row lock, taken by
//!   [`StockUnit::lock_product`] and held until the unit ends
//! - lock waits are bounded and fail with [`RepositoryError::Unavailable`]
//! - unit-of-work writes are staged and applied in one step on commit
//! - SKU, username and email uniqueness are enforced on write
//!
//! [`MemoryStore::fail_next`] injects a one-shot fault at a chosen step of a
//! unit of work.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use stockroom_core::{Email, ProductId, RecordState, Sku, TransactionId, UserId};

use super::{ProductStore, RepositoryError, StockUnit, TransactionStore, UserStore};
use crate::models::{
    NewProduct, NewTransaction, NewUser, Pagination, Product, ProductFilter, ProductPatch,
    ProfileChanges, Transaction, TransactionDetail, User,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// A step of a unit of work where a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `StockUnit::write_quantity`
    QuantityWrite,
    /// `StockUnit::write_metadata`
    MetadataWrite,
    /// `StockUnit::record`
    TransactionInsert,
    /// `StockUnit::commit`
    Commit,
}

#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    transactions: BTreeMap<TransactionId, Transaction>,
    users: BTreeMap<UserId, StoredUser>,
    next_product_id: i32,
    next_transaction_id: i32,
    next_user_id: i32,
    faults: HashSet<FaultPoint>,
}

struct StoredUser {
    user: User,
    password_hash: String,
}

impl Tables {
    fn take_fault(&mut self, point: FaultPoint) -> Result<(), RepositoryError> {
        if self.faults.remove(&point) {
            return Err(RepositoryError::Unavailable(format!(
                "injected fault at {point:?}"
            )));
        }
        Ok(())
    }

    fn detail(&self, transaction: &Transaction) -> Result<TransactionDetail, RepositoryError> {
        let product = self
            .products
            .get(&transaction.product_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "transaction {} references missing product {}",
                    transaction.id, transaction.product_id
                ))
            })?;
        Ok(TransactionDetail {
            transaction: transaction.clone(),
            product,
        })
    }

    fn active_product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).filter(|p| p.state.is_active())
    }
}

struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>>,
    lock_timeout: Duration,
}

impl Shared {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, id: ProductId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }
}

/// In-memory implementation of [`ProductStore`], [`TransactionStore`] and
/// [`UserStore`]. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with the default lock timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store whose units give up on a row lock after `lock_timeout`.
    #[must_use]
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                lock_timeout,
            }),
        }
    }

    /// Make the next unit of work that reaches `point` fail there.
    pub fn fail_next(&self, point: FaultPoint) {
        self.shared.tables().faults.insert(point);
    }

    /// Number of ledger entries across all products.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.shared.tables().transactions.len()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.shared.tables();
        if tables
            .products
            .values()
            .any(|p| p.state.is_active() && p.sku == product.sku)
        {
            return Err(RepositoryError::Conflict("sku already exists".to_owned()));
        }

        tables.next_product_id += 1;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(tables.next_product_id),
            name: product.name.clone(),
            sku: product.sku.clone(),
            description: product.description.clone(),
            price: product.price,
            quantity: product.quantity,
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.shared.tables().active_product(id).cloned())
    }

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .shared
            .tables()
            .products
            .values()
            .find(|p| p.state.is_active() && &p.sku == sku)
            .cloned())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, RepositoryError> {
        let (offset, limit) = page.bounds();
        Ok(self
            .shared
            .tables()
            .products
            .values()
            .filter(|p| p.state.is_active() && filter.matches(p))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.shared.tables();
        let Some(product) = tables
            .products
            .get_mut(&id)
            .filter(|p| p.state.is_active())
        else {
            return Ok(None);
        };
        patch.apply_to(product);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn soft_delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.shared.tables();
        match tables
            .products
            .get_mut(&id)
            .filter(|p| p.state.is_active())
        {
            Some(product) => {
                let now = Utc::now();
                product.state = RecordState::Deleted { deleted_at: now };
                product.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StockUnit>, RepositoryError> {
        Ok(Box::new(MemoryStockUnit {
            shared: Arc::clone(&self.shared),
            held: HashMap::new(),
            quantity_writes: BTreeMap::new(),
            metadata_writes: Vec::new(),
            entries: Vec::new(),
        }))
    }

    async fn find(&self, id: TransactionId) -> Result<Option<TransactionDetail>, RepositoryError> {
        let tables = self.shared.tables();
        tables
            .transactions
            .get(&id)
            .map(|t| tables.detail(t))
            .transpose()
    }

    async fn list(&self, page: Pagination) -> Result<Vec<TransactionDetail>, RepositoryError> {
        let (offset, limit) = page.bounds();
        let tables = self.shared.tables();
        tables
            .transactions
            .values()
            .rev()
            .skip(offset)
            .take(limit)
            .map(|t| tables.detail(t))
            .collect()
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> Result<Vec<TransactionDetail>, RepositoryError> {
        let (offset, limit) = page.bounds();
        let tables = self.shared.tables();
        tables
            .transactions
            .values()
            .rev()
            .filter(|t| t.product_id == product_id)
            .skip(offset)
            .take(limit)
            .map(|t| tables.detail(t))
            .collect()
    }

    async fn count_for_product(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let count = self
            .shared
            .tables()
            .transactions
            .values()
            .filter(|t| t.product_id == product_id)
            .count();
        i64::try_from(count).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }
}

/// Unit of work over a [`MemoryStore`].
///
/// Row locks live in `held`; dropping the unit releases them and discards
/// the staged writes.
struct MemoryStockUnit {
    shared: Arc<Shared>,
    held: HashMap<ProductId, OwnedMutexGuard<()>>,
    quantity_writes: BTreeMap<ProductId, i32>,
    metadata_writes: Vec<(ProductId, ProductPatch)>,
    entries: Vec<Transaction>,
}

impl MemoryStockUnit {
    fn ensure_locked(&self, id: ProductId) -> Result<(), RepositoryError> {
        if self.held.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable(format!(
                "product {id} is not locked by this unit of work"
            )))
        }
    }
}

#[async_trait]
impl StockUnit for MemoryStockUnit {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        if !self.held.contains_key(&id) {
            let lock = self.shared.row_lock(id);
            let guard = tokio::time::timeout(self.shared.lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    RepositoryError::Unavailable(format!(
                        "timed out waiting for row lock on product {id}"
                    ))
                })?;
            self.held.insert(id, guard);
        }

        let tables = self.shared.tables();
        Ok(tables.active_product(id).cloned().map(|mut product| {
            for (_, patch) in self.metadata_writes.iter().filter(|(pid, _)| *pid == id) {
                patch.apply_to(&mut product);
            }
            if let Some(&staged) = self.quantity_writes.get(&id) {
                product.quantity = staged;
            }
            product
        }))
    }

    async fn write_quantity(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        self.shared.tables().take_fault(FaultPoint::QuantityWrite)?;
        self.ensure_locked(id)?;
        if quantity < 0 {
            return Err(RepositoryError::Conflict(
                "quantity must not be negative".to_owned(),
            ));
        }
        self.quantity_writes.insert(id, quantity);
        Ok(())
    }

    async fn write_metadata(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<(), RepositoryError> {
        self.shared.tables().take_fault(FaultPoint::MetadataWrite)?;
        self.ensure_locked(id)?;
        self.metadata_writes.push((id, patch.clone()));
        Ok(())
    }

    async fn record(&mut self, entry: &NewTransaction) -> Result<Transaction, RepositoryError> {
        let mut tables = self.shared.tables();
        tables.take_fault(FaultPoint::TransactionInsert)?;
        if !tables.products.contains_key(&entry.product_id) {
            return Err(RepositoryError::Conflict(
                "transaction references unknown product".to_owned(),
            ));
        }

        tables.next_transaction_id += 1;
        let transaction = Transaction {
            id: TransactionId::new(tables.next_transaction_id),
            product_id: entry.product_id,
            quantity: entry.quantity,
            transaction_type: entry.transaction_type,
            notes: entry.notes.clone(),
            created_at: Utc::now(),
        };
        drop(tables);

        self.entries.push(transaction.clone());
        Ok(transaction)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let mut tables = self.shared.tables();
        tables.take_fault(FaultPoint::Commit)?;

        let now = Utc::now();
        for (id, patch) in &self.metadata_writes {
            let product = tables
                .products
                .get_mut(id)
                .ok_or(RepositoryError::NotFound)?;
            patch.apply_to(product);
            product.updated_at = now;
        }
        for (id, quantity) in &self.quantity_writes {
            let product = tables
                .products
                .get_mut(id)
                .ok_or(RepositoryError::NotFound)?;
            product.quantity = *quantity;
            product.updated_at = now;
        }
        for entry in &self.entries {
            tables.transactions.insert(entry.id, entry.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.shared.tables();
        if tables
            .users
            .values()
            .any(|u| u.user.username == user.username || u.user.email == user.email)
        {
            return Err(RepositoryError::Conflict(
                "username or email already exists".to_owned(),
            ));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(tables.next_user_id),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            created.id,
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash.clone(),
            },
        );
        Ok(created)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.shared.tables().users.get(&id).map(|u| u.user.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .shared
            .tables()
            .users
            .values()
            .find(|u| u.user.username == username)
            .map(|u| u.user.clone()))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .shared
            .tables()
            .users
            .values()
            .find(|u| &u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .shared
            .tables()
            .users
            .get(&id)
            .map(|u| u.password_hash.clone()))
    }

    async fn list(&self, page: Pagination) -> Result<Vec<User>, RepositoryError> {
        let (offset, limit) = page.bounds();
        Ok(self
            .shared
            .tables()
            .users
            .values()
            .skip(offset)
            .take(limit)
            .map(|u| u.user.clone())
            .collect())
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.shared.tables();
        if let Some(email) = &changes.email
            && tables
                .users
                .values()
                .any(|u| u.user.id != id && &u.user.email == email)
        {
            return Err(RepositoryError::Conflict("email already in use".to_owned()));
        }

        let Some(stored) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(&mut stored.user);
        stored.user.updated_at = Utc::now();
        Ok(Some(stored.user.clone()))
    }

    async fn update_password(&self, id: UserId, digest: &str) -> Result<bool, RepositoryError> {
        let mut tables = self.shared.tables();
        Ok(tables.users.get_mut(&id).is_some_and(|stored| {
            digest.clone_into(&mut stored.password_hash);
            stored.user.updated_at = Utc::now();
            true
        }))
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.shared.tables().users.remove(&id).is_some())
    }
}
