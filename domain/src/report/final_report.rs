use crate::annotation::cluster::{ClusterId, MarkerSet};
use crate::annotation::prediction::PredictionMatrix;
use crate::consensus::result::{ConsensusResult, ConsensusTable};
use crate::discussion::record::{ControversyRecord, DiscussionRound, transcript_lines};
use crate::oracle::spec::OracleName;
use serde::{Deserialize, Serialize};

/// An oracle call that failed and contributed no votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleFailure {
    pub oracle: OracleName,
    /// Phase in which the call failed (e.g. "annotation", "discussion round 2")
    pub phase: String,
    pub message: String,
}

impl OracleFailure {
    pub fn new(
        oracle: impl Into<OracleName>,
        phase: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            oracle: oracle.into(),
            phase: phase.into(),
            message: message.into(),
        }
    }
}

/// Outcome for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub cluster: ClusterId,
    /// Final consensus: the last discussion round's, or the initial one
    pub consensus: ConsensusResult,
    /// Consensus from the initial annotation pass
    pub initial: ConsensusResult,
    /// Flagged as controversial after the initial pass
    pub controversial: bool,
    pub rounds_used: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discussion: Vec<DiscussionRound>,
}

impl ClusterReport {
    pub fn transcript(&self) -> Vec<String> {
        transcript_lines(&self.discussion)
    }
}

/// Immutable result of one run. Every input cluster appears exactly once,
/// in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    clusters: Vec<ClusterReport>,
    controversial_clusters: Vec<ClusterId>,
    model_annotations: PredictionMatrix,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    oracle_failures: Vec<OracleFailure>,
}

impl FinalReport {
    /// Merge the initial consensus and the resolver's records.
    ///
    /// Clusters missing from `initial` are reported as unresolved.
    pub fn assemble(
        markers: &MarkerSet,
        initial: &ConsensusTable,
        records: Vec<ControversyRecord>,
        model_annotations: PredictionMatrix,
        oracle_failures: Vec<OracleFailure>,
    ) -> Self {
        let mut clusters = Vec::with_capacity(markers.len());
        let mut controversial_clusters = Vec::new();

        for id in markers.ids() {
            let initial_result = initial
                .get(id.as_str())
                .cloned()
                .unwrap_or_else(ConsensusResult::unresolved);

            let report = match records.iter().find(|r| r.cluster == id) {
                Some(record) => {
                    controversial_clusters.push(id.clone());
                    ClusterReport {
                        cluster: id,
                        consensus: record.current().clone(),
                        initial: initial_result,
                        controversial: true,
                        rounds_used: record.rounds_used(),
                        discussion: record.rounds().to_vec(),
                    }
                }
                None => ClusterReport {
                    cluster: id,
                    consensus: initial_result.clone(),
                    initial: initial_result,
                    controversial: false,
                    rounds_used: 0,
                    discussion: Vec::new(),
                },
            };
            clusters.push(report);
        }

        Self {
            clusters,
            controversial_clusters,
            model_annotations,
            oracle_failures,
        }
    }

    pub fn clusters(&self) -> &[ClusterReport] {
        &self.clusters
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterReport> {
        self.clusters.iter().find(|c| c.cluster.as_str() == id)
    }

    /// Final label of a cluster.
    pub fn label(&self, id: &str) -> Option<&str> {
        self.cluster(id).map(|c| c.consensus.label.as_str())
    }

    /// `(cluster, label)` pairs in input order.
    pub fn consensus(&self) -> impl Iterator<Item = (&ClusterId, &str)> {
        self.clusters
            .iter()
            .map(|c| (&c.cluster, c.consensus.label.as_str()))
    }

    pub fn proportions(&self) -> impl Iterator<Item = (&ClusterId, f64)> {
        self.clusters.iter().map(|c| (&c.cluster, c.consensus.proportion))
    }

    pub fn entropies(&self) -> impl Iterator<Item = (&ClusterId, f64)> {
        self.clusters.iter().map(|c| (&c.cluster, c.consensus.entropy))
    }

    /// Clusters that needed discussion, including those that never converged.
    pub fn controversial_clusters(&self) -> &[ClusterId] {
        &self.controversial_clusters
    }

    pub fn is_controversial(&self, id: &str) -> bool {
        self.controversial_clusters.iter().any(|c| c.as_str() == id)
    }

    /// Per-oracle predictions from the initial annotation pass.
    pub fn model_annotations(&self) -> &PredictionMatrix {
        &self.model_annotations
    }

    pub fn oracle_failures(&self) -> &[OracleFailure] {
        &self.oracle_failures
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::prediction::OraclePrediction;
    use crate::consensus::calculator::{compute_consensus_for, tally_votes};

    fn markers() -> MarkerSet {
        MarkerSet::new()
            .with_cluster("0", ["CD3D", "CD3E"])
            .with_cluster("1", ["MS4A1"])
            .with_cluster("2", ["PPBP"])
    }

    #[test]
    fn test_every_cluster_once_in_marker_order() {
        let matrix = PredictionMatrix::new()
            .with_oracle(
                "a",
                OraclePrediction::new()
                    .with_label("1", "B cells")
                    .with_label("0", "T cells"),
            )
            .with_oracle(
                "b",
                OraclePrediction::new()
                    .with_label("1", "Plasma cells")
                    .with_label("0", "T cells"),
            );
        let initial = compute_consensus_for(&matrix, &matrix.cluster_ids());

        let mut record = ControversyRecord::new("1", initial.get("1").unwrap().clone());
        record.record_round(1, vec![], tally_votes(["B cells", "B cells"]), true);

        let report = FinalReport::assemble(&markers(), &initial, vec![record], matrix, vec![]);

        let ids: Vec<_> = report.consensus().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(report.label("0"), Some("T cells"));
        assert_eq!(report.label("1"), Some("B cells"));
        assert_eq!(report.label("2"), Some("Unresolved"));

        assert_eq!(report.controversial_clusters(), &[ClusterId::from("1")]);
        let c1 = report.cluster("1").unwrap();
        assert_eq!(c1.rounds_used, 1);
        assert_eq!(c1.initial.proportion, 0.5);
        assert_eq!(c1.consensus.proportion, 1.0);
    }

    #[test]
    fn test_serializes_failures() {
        let report = FinalReport::assemble(
            &markers(),
            &ConsensusTable::new(),
            vec![],
            PredictionMatrix::new(),
            vec![OracleFailure::new("gpt-4.1", "annotation", "authentication failed")],
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["oracle_failures"][0]["oracle"], "gpt-4.1");
        assert_eq!(json["clusters"].as_array().unwrap().len(), 3);
    }
}
