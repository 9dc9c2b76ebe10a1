//! Business logic services.
//!
//! Services are cheap borrowing wrappers built per request from
//! [`AppState`](crate::state::AppState); they hold no state of their own.
//!
//! - [`catalog`] - product CRUD, soft delete, filtered listing
//! - [`ledger`] - atomic stock adjustments and transaction history
//! - [`auth`] - registration, login, bearer tokens, profiles

pub mod auth;
pub mod catalog;
pub mod ledger;

pub use auth::{AuthError, AuthService, Claims, Passwords, TokenIssuer};
pub use catalog::{CatalogError, CatalogService};
pub use ledger::{LedgerError, LedgerService};
