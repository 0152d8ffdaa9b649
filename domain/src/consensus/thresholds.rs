//! Controversy detection thresholds.

use super::result::{ConsensusResult, ConsensusTable};
use crate::annotation::cluster::ClusterId;
use crate::core::error::ConfigError;
use serde::Serialize;

pub const DEFAULT_CONSENSUS_THRESHOLD: f64 = 0.7;
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 1.0;

/// Run-level agreement thresholds. Both values lie in `[0, 1]`.
///
/// A cluster is controversial when its proportion is below
/// `consensus_threshold` **or** its entropy is above `entropy_threshold`.
///
/// # Example
///
/// ```
/// use celltype_domain::consensus::{ConsensusResult, ConsensusThresholds};
///
/// let thresholds = ConsensusThresholds::new(0.7, 0.6).unwrap();
/// let mut result = ConsensusResult::unresolved();
/// result.voters = 3;
/// result.proportion = 2.0 / 3.0;
/// assert!(thresholds.is_controversial(&result));
///
/// assert!(ConsensusThresholds::new(1.5, 0.6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsensusThresholds {
    consensus_threshold: f64,
    entropy_threshold: f64,
}

impl ConsensusThresholds {
    pub fn new(consensus_threshold: f64, entropy_threshold: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            consensus_threshold: ConfigError::check_unit_interval(
                "consensus_threshold",
                consensus_threshold,
            )?,
            entropy_threshold: ConfigError::check_unit_interval(
                "entropy_threshold",
                entropy_threshold,
            )?,
        })
    }

    pub fn consensus_threshold(&self) -> f64 {
        self.consensus_threshold
    }

    pub fn entropy_threshold(&self) -> f64 {
        self.entropy_threshold
    }

    pub fn is_controversial(&self, result: &ConsensusResult) -> bool {
        result.proportion < self.consensus_threshold || result.entropy > self.entropy_threshold
    }

    /// Controversial clusters of a table, in table order.
    pub fn controversial_clusters(&self, table: &ConsensusTable) -> Vec<ClusterId> {
        table
            .iter()
            .filter(|(_, r)| self.is_controversial(r))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self {
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::calculator::tally_votes;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(ConsensusThresholds::new(-0.1, 0.5).is_err());
        assert!(ConsensusThresholds::new(0.5, 1.01).is_err());
        assert!(ConsensusThresholds::new(f64::NAN, 0.5).is_err());
        assert!(ConsensusThresholds::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn test_paraphrases_are_controversial() {
        let thresholds = ConsensusThresholds::new(0.7, 1.0).unwrap();
        let r = tally_votes(["T cells", "T lymphocytes", "CD4+ T cells"]);
        assert!(thresholds.is_controversial(&r));
    }

    #[test]
    fn test_either_axis_is_sufficient() {
        let thresholds = ConsensusThresholds::new(0.6, 0.5).unwrap();
        // proportion 2/3 passes, entropy 0.918 fails
        let r = tally_votes(["B cells", "B cells", "Plasma cells"]);
        assert!(thresholds.is_controversial(&r));

        let lenient = ConsensusThresholds::new(0.6, 1.0).unwrap();
        assert!(!lenient.is_controversial(&r));
    }

    #[test]
    fn test_unanimous_never_controversial() {
        let thresholds = ConsensusThresholds::new(1.0, 0.0).unwrap();
        let r = tally_votes(["NK cells", "NK cells", "NK cells"]);
        assert!(!thresholds.is_controversial(&r));
    }

    #[test]
    fn test_controversial_clusters_keeps_order() {
        let mut table = ConsensusTable::new();
        table.insert("2", tally_votes(["a", "b"]));
        table.insert("1", tally_votes(["a", "a"]));
        table.insert("0", tally_votes(["a", "c"]));
        let ids = ConsensusThresholds::default().controversial_clusters(&table);
        assert_eq!(ids, vec![ClusterId::from("2"), ClusterId::from("0")]);
    }
}
