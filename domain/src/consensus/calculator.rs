//! Consensus Calculator.
//!
//! Labels are grouped into classes by [`label_key`] (case-insensitive,
//! whitespace-collapsed). The largest class wins; ties go to the class whose
//! first member came from the earliest oracle. The empty "unknown" label
//! forms its own class and only wins when every voter answered unknown.

use super::result::{ConsensusMethod, ConsensusResult, ConsensusTable};
use crate::annotation::cluster::ClusterId;
use crate::annotation::normalize::label_key;
use crate::annotation::prediction::PredictionMatrix;

/// Compute consensus for every cluster mentioned anywhere in the matrix.
///
/// An empty matrix yields an empty table.
///
/// # Example
///
/// ```
/// use celltype_domain::annotation::{OraclePrediction, PredictionMatrix};
/// use celltype_domain::consensus::compute_consensus;
///
/// let matrix = PredictionMatrix::new()
///     .with_oracle("a", OraclePrediction::new().with_label("3", "NK cells"))
///     .with_oracle("b", OraclePrediction::new().with_label("3", "NK cells"))
///     .with_oracle("c", OraclePrediction::new().with_label("3", "nk  cells"));
///
/// let table = compute_consensus(&matrix);
/// let result = table.get("3").unwrap();
/// assert_eq!(result.label, "NK cells");
/// assert_eq!(result.proportion, 1.0);
/// assert_eq!(result.entropy, 0.0);
/// ```
pub fn compute_consensus(matrix: &PredictionMatrix) -> ConsensusTable {
    compute_consensus_for(matrix, &matrix.cluster_ids())
}

/// Compute consensus for the given clusters, in the given order.
///
/// Clusters no oracle voted on get [`ConsensusResult::unresolved`].
pub fn compute_consensus_for(matrix: &PredictionMatrix, clusters: &[ClusterId]) -> ConsensusTable {
    clusters
        .iter()
        .map(|id| (id.clone(), consensus_for_cluster(matrix, id.as_str())))
        .collect()
}

/// Consensus for a single cluster. Oracles without a prediction for it are
/// not counted.
pub fn consensus_for_cluster(matrix: &PredictionMatrix, cluster: &str) -> ConsensusResult {
    tally_votes(matrix.votes_for(cluster).map(|(_, label)| label))
}

struct VoteClass<'a> {
    key: String,
    label: &'a str,
    count: usize,
}

/// Tally normalized labels, given in oracle order.
pub fn tally_votes<'a>(votes: impl IntoIterator<Item = &'a str>) -> ConsensusResult {
    let mut classes: Vec<VoteClass<'a>> = Vec::new();
    let mut voters = 0usize;

    for label in votes {
        voters += 1;
        let key = label_key(label);
        match classes.iter_mut().find(|c| c.key == key) {
            Some(class) => class.count += 1,
            None => classes.push(VoteClass { key, label, count: 1 }),
        }
    }

    if voters == 0 {
        return ConsensusResult::unresolved();
    }

    // Strict `>` keeps the first-seen class on ties.
    let mut winner: Option<&VoteClass<'a>> = None;
    for class in classes.iter().filter(|c| !c.key.is_empty()) {
        if winner.is_none_or(|w| class.count > w.count) {
            winner = Some(class);
        }
    }
    let (label, count) = match winner {
        Some(class) => (class.label.trim().to_string(), class.count),
        // Only the unknown class exists
        None => (String::new(), voters),
    };

    ConsensusResult {
        label,
        proportion: count as f64 / voters as f64,
        entropy: normalized_entropy(classes.iter().map(|c| c.count), voters),
        voters,
        method: ConsensusMethod::Lexical,
    }
}

/// Shannon entropy (base 2) of the class distribution divided by
/// `log2(k)`, or 0 when there is a single class.
fn normalized_entropy(counts: impl Iterator<Item = usize> + Clone, total: usize) -> f64 {
    let k = counts.clone().count();
    if k <= 1 || total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = counts
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    (h / (k as f64).log2()).clamp(0.0, 1.0)
}
