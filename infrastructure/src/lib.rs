//! Infrastructure layer for celltype-quorum
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: HTTP oracle providers, response caches, the
//! JSONL conversation log, and configuration file loading.

pub mod cache;
pub mod config;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use cache::{CacheStats, FileResponseCache, InMemoryResponseCache};
pub use config::{
    ConfigIssue, ConfigLoader, FileCacheConfig, FileConfig, FileConsensusConfig,
    FileLoggingConfig, FileOracleConfig, FileOutputConfig, Severity,
};
pub use logging::JsonlConversationLogger;
pub use providers::{HttpOracleGateway, HttpSettings, ProviderAdapter};
