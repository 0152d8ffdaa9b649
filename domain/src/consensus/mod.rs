//! Consensus over a round's predictions.
//!
//! - [`calculator`]: lexical voting, proportion and normalized entropy
//! - [`thresholds`]: controversy detection
//! - [`check`]: parsing and validating an oracle's own consensus judgement

pub mod calculator;
pub mod check;
pub mod result;
pub mod thresholds;

pub use calculator::{compute_consensus, compute_consensus_for, consensus_for_cluster, tally_votes};
pub use check::{CheckedConsensus, parse_consensus_check};
pub use result::{ConsensusMethod, ConsensusResult, ConsensusTable};
pub use thresholds::ConsensusThresholds;
