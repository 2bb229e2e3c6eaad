//! Core types, store traits, and the identification consensus and
//! relationship aggregation engine for Hostlink.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement the traits in [`store`]; the surrounding CRUD
//! layer talks to the [`engine::Engine`] facade.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod identification;
pub mod ledger;
pub mod observation;
pub mod relationship;
pub mod store;
pub mod taxonomy;
pub mod verification;

pub use engine::Engine;
pub use error::{Error, Result};
