//! Persistence layer
//!
//! Domains and their measurement history live in a libsql database;
//! the orchestrator only sees the [`PersistenceStore`] trait.

pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{LibsqlStore, PersistenceStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot connect to {0}")]
    Connect(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),
}
