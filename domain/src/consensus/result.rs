//! Consensus result types.

use crate::annotation::cluster::ClusterId;
use crate::annotation::normalize::UNRESOLVED_LABEL;
use serde::{Deserialize, Serialize};

/// How a consensus label was decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    /// Lexical majority vote over normalized labels
    #[default]
    Lexical,
    /// Judged by a checker oracle and validated
    Oracle,
}

/// Consensus for one cluster in one round.
///
/// Label, proportion and entropy always come from the same prediction
/// matrix snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Winning label (may be empty when every voter answered "unknown")
    pub label: String,
    /// Share of voters in the winning class, in `[0, 1]`
    pub proportion: f64,
    /// Normalized Shannon entropy of the class distribution, in `[0, 1]`
    pub entropy: f64,
    /// Number of oracles that voted on this cluster
    pub voters: usize,
    #[serde(default)]
    pub method: ConsensusMethod,
}

impl ConsensusResult {
    /// Placeholder for a cluster nobody voted on.
    pub fn unresolved() -> Self {
        Self {
            label: UNRESOLVED_LABEL.to_string(),
            proportion: 0.0,
            entropy: 0.0,
            voters: 0,
            method: ConsensusMethod::Lexical,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.voters == 0
    }

    /// Every voter agreed.
    pub fn is_unanimous(&self) -> bool {
        self.voters > 0 && self.proportion >= 1.0
    }
}

/// Per-cluster consensus for one round, in cluster order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusTable {
    entries: Vec<(ClusterId, ConsensusResult)>,
}

impl ConsensusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the result for a cluster. A replaced cluster keeps
    /// its position.
    pub fn insert(&mut self, cluster: impl Into<ClusterId>, result: ConsensusResult) {
        let cluster = cluster.into();
        match self.entries.iter_mut().find(|(id, _)| *id == cluster) {
            Some((_, existing)) => *existing = result,
            None => self.entries.push((cluster, result)),
        }
    }

    pub fn get(&self, cluster: &str) -> Option<&ConsensusResult> {
        self.entries
            .iter()
            .find(|(id, _)| id.as_str() == cluster)
            .map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClusterId, &ConsensusResult)> {
        self.entries.iter().map(|(id, r)| (id, r))
    }

    pub fn cluster_ids(&self) -> impl Iterator<Item = &ClusterId> {
        self.entries.iter().map(|(id, _)| id)
    }
}

impl FromIterator<(ClusterId, ConsensusResult)> for ConsensusTable {
    fn from_iter<I: IntoIterator<Item = (ClusterId, ConsensusResult)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (id, result) in iter {
            table.insert(id, result);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, proportion: f64) -> ConsensusResult {
        ConsensusResult {
            label: label.to_string(),
            proportion,
            entropy: 0.0,
            voters: 3,
            method: ConsensusMethod::Lexical,
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = ConsensusTable::new();
        table.insert("1", result("T cells", 0.5));
        table.insert("2", result("B cells", 1.0));
        table.insert("1", result("NK cells", 1.0));

        let ids: Vec<_> = table.cluster_ids().map(|c| c.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(table.get("1").unwrap().label, "NK cells");
    }

    #[test]
    fn test_unresolved_placeholder() {
        let r = ConsensusResult::unresolved();
        assert!(r.is_unresolved());
        assert!(!r.is_unanimous());
        assert_eq!(r.label, UNRESOLVED_LABEL);
        assert_eq!(r.proportion, 0.0);
    }
}
