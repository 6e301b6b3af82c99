//! Query execution and probe timing
//!
//! This module is responsible for:
//! - The [`QueryRunner`] contract used by the orchestrator
//! - DNS lookups through hickory-resolver
//! - The periodic tick source of the probe loop

pub mod dns;
pub mod runner;
pub mod scheduler;
pub mod types;

pub use dns::DnsQueryRunner;
pub use runner::QueryRunner;
pub use scheduler::{Schedule, Ticker};
pub use types::Reply;
