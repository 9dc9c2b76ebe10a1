//! Stockroom Core - Shared domain types.
//!
//! This crate provides the vocabulary shared by every Stockroom component:
//! - `api` - The inventory REST service
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access. Stock arithmetic lives here ([`TransactionType::apply`]) so the
//! non-negativity rule can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, SKUs, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
