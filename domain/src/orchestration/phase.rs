//! Phases of an annotation run

use serde::{Deserialize, Serialize};

/// Phase of an annotation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    /// Every oracle annotates every cluster once
    Annotation,
    /// A checker oracle judges agreement per cluster
    ConsensusCheck,
    /// Controversial clusters are re-queried with the others' answers
    Discussion { round: usize },
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Annotation => "annotation",
            Phase::ConsensusCheck => "consensus_check",
            Phase::Discussion { .. } => "discussion",
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Phase::Annotation => "Annotation".to_string(),
            Phase::ConsensusCheck => "Consensus Check".to_string(),
            Phase::Discussion { round } => format!("Discussion Round {}", round),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Phase::Annotation.to_string(), "Annotation");
        assert_eq!(Phase::Discussion { round: 2 }.to_string(), "Discussion Round 2");
        assert_eq!(Phase::Discussion { round: 2 }.as_str(), "discussion");
    }
}
