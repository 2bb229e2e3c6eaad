//! SQLite backend for the Hostlink engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Relationship counters are changed only
//! inside `IMMEDIATE` transactions.

mod catalog;
mod encode;
mod relationships;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;


#[cfg(test)]
mod engine_tests;
