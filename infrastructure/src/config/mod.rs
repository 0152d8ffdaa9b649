//! Configuration file loading for celltype-quorum
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CELLTYPE_QUORUM_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./celltype-quorum.toml` or `./.celltype-quorum.toml`
//! 4. Global: `$XDG_CONFIG_HOME/celltype-quorum/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileAnnotationConfig, FileCacheConfig, FileConfig, FileConsensusConfig,
    FileHttpConfig, FileLoggingConfig, FileOracleConfig, FileOutputConfig, FileProviderConfig,
    Severity,
};
pub use loader::ConfigLoader;
