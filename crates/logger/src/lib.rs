//! Tracing setup shared by the workspace binaries.

mod subscriber;

pub use subscriber::{init, level_from_verbosity};
