//! How the individual oracles compare with the final consensus and with
//! each other.
//!
//! Built from a [`FinalReport`]: the initial per-oracle predictions are
//! compared with each cluster's final consensus label, using the same
//! case-insensitive [`label_key`] as voting. Clusters that ended unresolved
//! are left out. A cluster an oracle did not answer counts neither for nor
//! against it; an empty ("unknown") answer counts as a disagreement.

use super::final_report::FinalReport;
use crate::annotation::normalize::label_key;
use crate::oracle::spec::OracleName;
use serde::{Deserialize, Serialize};

/// One oracle's agreement with the final consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleAgreement {
    pub oracle: OracleName,
    /// Clusters where the oracle's initial label matched the consensus
    pub agreed: usize,
    /// Resolved clusters the oracle gave a label for
    pub answered: usize,
}

impl OracleAgreement {
    pub fn rate(&self) -> f64 {
        ratio(self.agreed, self.answered)
    }
}

/// Agreement between two oracles' initial labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAgreement {
    pub first: OracleName,
    pub second: OracleName,
    pub agreed: usize,
    /// Clusters both oracles answered
    pub shared: usize,
}

impl PairAgreement {
    pub fn rate(&self) -> f64 {
        ratio(self.agreed, self.shared)
    }
}

/// An oracle label that disagreed with the consensus, with how often the
/// same substitution occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub consensus: String,
    pub predicted: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// In oracle order
    pub agreement: Vec<OracleAgreement>,
    /// Every unordered pair, in oracle order
    pub pairs: Vec<PairAgreement>,
    /// Most frequent first; ties keep first-seen order
    pub confusions: Vec<Confusion>,
}

impl ModelComparison {
    pub fn from_report(report: &FinalReport) -> Self {
        let matrix = report.model_annotations();
        let resolved: Vec<_> = report
            .clusters()
            .iter()
            .filter(|c| !c.consensus.is_unresolved())
            .collect();

        let mut agreement = Vec::with_capacity(matrix.len());
        let mut confusions: Vec<(String, String, Confusion)> = Vec::new();
        for (oracle, prediction) in matrix.iter() {
            let mut row = OracleAgreement {
                oracle: oracle.clone(),
                agreed: 0,
                answered: 0,
            };
            for cluster in &resolved {
                let Some(label) = prediction.label(cluster.cluster.as_str()) else {
                    continue;
                };
                row.answered += 1;

                let consensus_key = label_key(&cluster.consensus.label);
                let predicted_key = label_key(label);
                if consensus_key == predicted_key {
                    row.agreed += 1;
                    continue;
                }
                match confusions
                    .iter_mut()
                    .find(|(c, p, _)| *c == consensus_key && *p == predicted_key)
                {
                    Some((_, _, confusion)) => confusion.count += 1,
                    None => confusions.push((
                        consensus_key,
                        predicted_key,
                        Confusion {
                            consensus: cluster.consensus.label.clone(),
                            predicted: label.to_string(),
                            count: 1,
                        },
                    )),
                }
            }
            agreement.push(row);
        }

        let oracles: Vec<_> = matrix.iter().collect();
        let mut pairs = Vec::new();
        for (i, (first, a)) in oracles.iter().enumerate() {
            for (second, b) in &oracles[i + 1..] {
                let mut pair = PairAgreement {
                    first: (*first).clone(),
                    second: (*second).clone(),
                    agreed: 0,
                    shared: 0,
                };
                for cluster in report.clusters() {
                    let id = cluster.cluster.as_str();
                    if let (Some(x), Some(y)) = (a.label(id), b.label(id)) {
                        pair.shared += 1;
                        if label_key(x) == label_key(y) {
                            pair.agreed += 1;
                        }
                    }
                }
                pairs.push(pair);
            }
        }

        let mut confusions: Vec<Confusion> = confusions.into_iter().map(|(_, _, c)| c).collect();
        confusions.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            agreement,
            pairs,
            confusions,
        }
    }

    pub fn agreement_of(&self, oracle: &str) -> Option<&OracleAgreement> {
        self.agreement.iter().find(|a| a.oracle.as_str() == oracle)
    }

    pub fn pair(&self, first: &str, second: &str) -> Option<&PairAgreement> {
        self.pairs.iter().find(|p| {
            (p.first.as_str() == first && p.second.as_str() == second)
                || (p.first.as_str() == second && p.second.as_str() == first)
        })
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
