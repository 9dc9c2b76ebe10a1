//! Stockroom inventory API library.
//!
//! Products, an append-only stock ledger and user accounts behind a JSON
//! HTTP surface. The binary in `main.rs` wires this library to `PostgreSQL`;
//! tests wire it to [`db::MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
