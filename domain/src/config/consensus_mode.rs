use serde::{Deserialize, Serialize};

/// How agreement between oracles is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusMode {
    /// Majority vote over normalized labels
    #[default]
    Lexical,
    /// A checker oracle judges agreement, falling back to lexical voting
    /// when its answer does not validate
    Oracle,
}

impl ConsensusMode {
    pub fn as_str(&self) -> &str {
        match self {
            ConsensusMode::Lexical => "lexical",
            ConsensusMode::Oracle => "oracle",
        }
    }
}

impl std::fmt::Display for ConsensusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConsensusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" => Ok(ConsensusMode::Lexical),
            "oracle" | "llm" => Ok(ConsensusMode::Oracle),
            other => Err(format!("unknown consensus mode: {}", other)),
        }
    }
}
