//! Controversy records.
//!
//! ```text
//! Pending ──begin_round──▶ Discussing ──record_round(converged)──▶ Resolved
//!                              ▲   │
//!                              └───┘ record_round / skip_round
//!                                    (until the round budget is spent,
//!                                     then close() resolves as-is)
//! ```

use crate::annotation::cluster::ClusterId;
use crate::consensus::result::ConsensusResult;
use crate::oracle::spec::OracleName;
use serde::{Deserialize, Serialize};

/// Lifecycle of a controversial cluster.
///
/// `Resolved` covers both convergence and an exhausted round budget; the
/// final proportion and entropy tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionState {
    Pending,
    Discussing,
    Resolved,
}

impl DiscussionState {
    pub fn as_str(&self) -> &str {
        match self {
            DiscussionState::Pending => "pending",
            DiscussionState::Discussing => "discussing",
            DiscussionState::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for DiscussionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one oracle said about one cluster in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleStatement {
    pub oracle: OracleName,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl OracleStatement {
    pub fn new(oracle: impl Into<OracleName>, label: impl Into<String>) -> Self {
        Self {
            oracle: oracle.into(),
            label: label.into(),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        self.reasoning = (!reasoning.trim().is_empty()).then_some(reasoning);
        self
    }
}

/// One discussion round for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionRound {
    /// Round number (1-indexed)
    pub round: usize,
    pub statements: Vec<OracleStatement>,
    /// Consensus after this round. Carried over unchanged when skipped.
    pub consensus: ConsensusResult,
    /// No oracle answered in this round
    #[serde(default)]
    pub skipped: bool,
}

/// Accumulated discussion for one controversial cluster.
///
/// The transcript is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControversyRecord {
    pub cluster: ClusterId,
    state: DiscussionState,
    /// Consensus from the initial annotation pass
    initial: ConsensusResult,
    rounds: Vec<DiscussionRound>,
    /// Round in which the record was resolved; `None` while open
    resolved_round: Option<usize>,
}

impl ControversyRecord {
    pub fn new(cluster: impl Into<ClusterId>, initial: ConsensusResult) -> Self {
        Self {
            cluster: cluster.into(),
            state: DiscussionState::Pending,
            initial,
            rounds: Vec::new(),
            resolved_round: None,
        }
    }

    pub fn state(&self) -> DiscussionState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == DiscussionState::Resolved
    }

    pub fn initial(&self) -> &ConsensusResult {
        &self.initial
    }

    pub fn rounds(&self) -> &[DiscussionRound] {
        &self.rounds
    }

    /// Number of discussion rounds this cluster went through.
    pub fn rounds_used(&self) -> usize {
        self.rounds.len()
    }

    pub fn resolved_round(&self) -> Option<usize> {
        self.resolved_round
    }

    /// Latest consensus: the last round's, or the initial one.
    pub fn current(&self) -> &ConsensusResult {
        self.rounds
            .last()
            .map(|r| &r.consensus)
            .unwrap_or(&self.initial)
    }

    /// Latest round that actually produced statements.
    pub fn last_spoken_round(&self) -> Option<&DiscussionRound> {
        self.rounds.iter().rev().find(|r| !r.skipped)
    }

    /// Enter `Discussing`. No effect once resolved.
    pub fn begin_round(&mut self) {
        if self.state == DiscussionState::Pending {
            self.state = DiscussionState::Discussing;
        }
    }

    /// Append a round's statements and recomputed consensus. When
    /// `converged`, the record becomes `Resolved`.
    pub fn record_round(
        &mut self,
        round: usize,
        statements: Vec<OracleStatement>,
        consensus: ConsensusResult,
        converged: bool,
    ) {
        if self.is_resolved() {
            return;
        }
        self.state = DiscussionState::Discussing;
        self.rounds.push(DiscussionRound {
            round,
            statements,
            consensus,
            skipped: false,
        });
        if converged {
            self.resolve(round);
        }
    }

    /// Append a round in which no oracle answered; the prior consensus
    /// carries over.
    pub fn skip_round(&mut self, round: usize) {
        if self.is_resolved() {
            return;
        }
        self.state = DiscussionState::Discussing;
        let consensus = self.current().clone();
        self.rounds.push(DiscussionRound {
            round,
            statements: Vec::new(),
            consensus,
            skipped: true,
        });
    }

    /// Resolve with whatever consensus the last round produced.
    pub fn close(&mut self) {
        if !self.is_resolved() {
            let last = self.rounds.last().map(|r| r.round).unwrap_or(0);
            self.resolve(last);
        }
    }

    fn resolve(&mut self, round: usize) {
        self.state = DiscussionState::Resolved;
        self.resolved_round = Some(round);
    }

    /// Plain-text transcript, one line per statement.
    pub fn transcript(&self) -> Vec<String> {
        transcript_lines(&self.rounds)
    }
}

/// Render discussion rounds as "Round N - oracle: label (reasoning)" lines.
pub fn transcript_lines(rounds: &[DiscussionRound]) -> Vec<String> {
    let mut lines = Vec::new();
    for round in rounds {
        if round.skipped {
            lines.push(format!("Round {}: no responses", round.round));
            continue;
        }
        for s in &round.statements {
            let label = if s.label.is_empty() { "(unknown)" } else { &s.label };
            match &s.reasoning {
                Some(reason) => lines.push(format!(
                    "Round {} - {}: {} ({})",
                    round.round, s.oracle, label, reason
                )),
                None => lines.push(format!("Round {} - {}: {}", round.round, s.oracle, label)),
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::calculator::tally_votes;

    fn split() -> ConsensusResult {
        tally_votes(["T cells", "NK cells"])
    }

    #[test]
    fn test_pending_to_discussing_to_resolved() {
        let mut record = ControversyRecord::new("1", split());
        assert_eq!(record.state(), DiscussionState::Pending);

        record.begin_round();
        assert_eq!(record.state(), DiscussionState::Discussing);

        record.record_round(
            1,
            vec![OracleStatement::new("a", "NK cells"), OracleStatement::new("b", "NK cells")],
            tally_votes(["NK cells", "NK cells"]),
            true,
        );
        assert!(record.is_resolved());
        assert_eq!(record.resolved_round(), Some(1));
        assert_eq!(record.current().label, "NK cells");
        assert_eq!(record.rounds_used(), 1);
    }

    #[test]
    fn test_resolved_record_is_frozen() {
        let mut record = ControversyRecord::new("1", split());
        record.record_round(1, vec![], tally_votes(["a", "a"]), true);
        record.record_round(2, vec![], tally_votes(["a", "b"]), false);
        record.skip_round(3);
        assert_eq!(record.rounds_used(), 1);
        assert_eq!(record.current().label, "a");
    }

    #[test]
    fn test_skip_carries_consensus_over() {
        let mut record = ControversyRecord::new("1", split());
        record.record_round(
            1,
            vec![OracleStatement::new("a", "B cells")],
            tally_votes(["B cells", "T cells"]),
            false,
        );
        record.skip_round(2);
        record.close();

        assert!(record.is_resolved());
        assert_eq!(record.resolved_round(), Some(2));
        assert!(record.rounds()[1].skipped);
        assert_eq!(record.current(), &record.rounds()[0].consensus);
        assert_eq!(record.last_spoken_round().unwrap().round, 1);
    }

    #[test]
    fn test_transcript_lines() {
        let mut record = ControversyRecord::new("1", split());
        record.record_round(
            1,
            vec![
                OracleStatement::new("gpt", "NK cells").with_reasoning("NKG7 high"),
                OracleStatement::new("claude", ""),
            ],
            tally_votes(["NK cells", ""]),
            false,
        );
        record.skip_round(2);
        assert_eq!(
            record.transcript(),
            vec![
                "Round 1 - gpt: NK cells (NKG7 high)".to_string(),
                "Round 1 - claude: (unknown)".to_string(),
                "Round 2: no responses".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_reasoning_dropped() {
        let s = OracleStatement::new("a", "x").with_reasoning("   ");
        assert!(s.reasoning.is_none());
    }
}
