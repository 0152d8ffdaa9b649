//! Application-level configuration.

pub mod run_config;

pub use run_config::{DEFAULT_MAX_DISCUSSION_ROUNDS, RunConfig};
