//! Domain models for the inventory API.
//!
//! These are validated domain objects; database row types live next to the
//! queries in [`crate::db`].

pub mod pagination;
pub mod product;
pub mod transaction;
pub mod user;

pub use pagination::Pagination;
pub use product::{NewProduct, Product, ProductFilter, ProductPatch};
pub use transaction::{NewTransaction, Transaction, TransactionDetail};
pub use user::{NewUser, ProfileChanges, User};
