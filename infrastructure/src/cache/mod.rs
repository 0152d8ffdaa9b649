//! Response caches implementing the `ResponseCache` port.
//!
//! - [`FileResponseCache`]: one JSON file per fingerprint, survives runs
//! - [`InMemoryResponseCache`]: process-local, for tests and `--no-cache`
//!   style dry runs

mod file_cache;
mod memory;

pub use file_cache::{CacheStats, FileResponseCache};
pub use memory::InMemoryResponseCache;
