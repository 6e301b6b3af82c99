use thiserror::Error;

use crate::config::ConfigError;
use crate::database::StoreError;

/// Conditions that prevent the probe from starting
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Database name is required")]
    MissingDatabase,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot create a resolver: {0}")]
    Resolver(String),

    #[error("Cannot install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}
