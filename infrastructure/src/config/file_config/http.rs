//! HTTP client settings from TOML (`[http]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHttpConfig {
    /// Per-request timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Retries after the first attempt for retryable errors (default: 3)
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled each retry (default: 2000)
    pub retry_base_delay_ms: u64,
}

impl Default for FileHttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 2000,
        }
    }
}
