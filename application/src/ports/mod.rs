//! Port definitions (interfaces) for the application layer
//!
//! Ports define the boundaries between the application and the outside
//! world. Adapters in the infrastructure layer implement them.

pub mod conversation_logger;
pub mod oracle_gateway;
pub mod progress;
pub mod response_cache;
