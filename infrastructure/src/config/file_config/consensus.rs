//! Consensus settings from TOML (`[consensus]` section)

use celltype_application::config::DEFAULT_MAX_DISCUSSION_ROUNDS;
use celltype_domain::ConsensusMode;
use celltype_domain::consensus::thresholds::{
    DEFAULT_CONSENSUS_THRESHOLD, DEFAULT_ENTROPY_THRESHOLD,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    /// Minimum agreement proportion (default: 0.7)
    pub threshold: f64,
    /// Maximum normalized entropy (default: 1.0)
    pub entropy_threshold: f64,
    /// Discussion rounds for controversial clusters (default: 3)
    pub max_discussion_rounds: usize,
    /// "lexical" or "oracle"
    pub mode: ConsensusMode,
    /// Oracle that judges agreement in oracle mode (default: first oracle)
    pub checker: Option<String>,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONSENSUS_THRESHOLD,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            max_discussion_rounds: DEFAULT_MAX_DISCUSSION_ROUNDS,
            mode: ConsensusMode::Lexical,
            checker: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConsensusConfig::default();
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.entropy_threshold, 1.0);
        assert_eq!(config.max_discussion_rounds, 3);
        assert_eq!(config.mode, ConsensusMode::Lexical);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let toml_str = r#"
[consensus]
threshold = 0.6
mode = "oracle"
checker = "gpt-4.1"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.consensus.threshold, 0.6);
        assert_eq!(config.consensus.entropy_threshold, 1.0);
        assert_eq!(config.consensus.mode, ConsensusMode::Oracle);
        assert_eq!(config.consensus.checker.as_deref(), Some("gpt-4.1"));
    }
}
