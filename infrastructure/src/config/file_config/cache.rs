//! Response cache settings from TOML (`[cache]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    /// Cache oracle responses on disk (default: true)
    pub enabled: bool,
    /// Cache directory (default: `$XDG_CACHE_HOME/celltype-quorum`)
    pub dir: Option<PathBuf>,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl FileCacheConfig {
    /// Directory cache entries are written to.
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("celltype-quorum")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = FileCacheConfig {
            enabled: true,
            dir: Some(PathBuf::from("/tmp/ct-cache")),
        };
        assert_eq!(config.resolved_dir(), Some(PathBuf::from("/tmp/ct-cache")));
    }
}
