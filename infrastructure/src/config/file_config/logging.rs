//! Logging destinations from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the daily-rolling diagnostic log
    pub dir: Option<PathBuf>,
    /// JSONL transcript of every oracle exchange
    pub conversation_log: Option<PathBuf>,
}
