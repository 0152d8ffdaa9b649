//! Per-oracle predictions and the per-round prediction matrix.

use super::cluster::ClusterId;
use crate::oracle::OracleName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Labels produced by one oracle for one round.
///
/// A cluster missing from the map means the oracle cast no vote for it;
/// an empty label means it voted "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OraclePrediction {
    labels: HashMap<ClusterId, String>,
}

impl OraclePrediction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cluster: impl Into<ClusterId>, label: impl Into<String>) {
        self.labels.insert(cluster.into(), label.into());
    }

    pub fn with_label(mut self, cluster: impl Into<ClusterId>, label: impl Into<String>) -> Self {
        self.insert(cluster, label);
        self
    }

    pub fn label(&self, cluster: &str) -> Option<&str> {
        self.labels.get(cluster).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClusterId, &str)> {
        self.labels.iter().map(|(k, v)| (k, v.as_str()))
    }
}

impl<K: Into<ClusterId>, V: Into<String>> FromIterator<(K, V)> for OraclePrediction {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut prediction = OraclePrediction::new();
        for (k, v) in iter {
            prediction.insert(k, v);
        }
        prediction
    }
}

/// OracleName → OraclePrediction for a single round, in oracle order.
///
/// Order matters: ties in the consensus vote are broken by the first oracle
/// (in this order) that proposed the label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionMatrix {
    entries: Vec<(OracleName, OraclePrediction)>,
}

impl PredictionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one oracle's predictions, keeping its first position.
    pub fn insert(&mut self, oracle: impl Into<OracleName>, prediction: OraclePrediction) {
        let oracle = oracle.into();
        match self.entries.iter_mut().find(|(name, _)| *name == oracle) {
            Some(entry) => entry.1 = prediction,
            None => self.entries.push((oracle, prediction)),
        }
    }

    pub fn with_oracle(mut self, oracle: impl Into<OracleName>, prediction: OraclePrediction) -> Self {
        self.insert(oracle, prediction);
        self
    }

    pub fn get(&self, oracle: &str) -> Option<&OraclePrediction> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_str() == oracle)
            .map(|(_, p)| p)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn oracles(&self) -> impl Iterator<Item = &OracleName> {
        self.entries.iter().map(|(name, _)| name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OracleName, &OraclePrediction)> {
        self.entries.iter().map(|(name, p)| (name, p))
    }

    /// Votes for one cluster in oracle order. Oracles without a prediction
    /// for the cluster are skipped.
    pub fn votes_for<'a>(&'a self, cluster: &'a str) -> impl Iterator<Item = (&'a OracleName, &'a str)> {
        self.entries
            .iter()
            .filter_map(move |(name, p)| p.label(cluster).map(|label| (name, label)))
    }

    /// Every cluster id mentioned by any oracle, in first-seen order.
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        let mut ids: Vec<ClusterId> = Vec::new();
        for (_, prediction) in &self.entries {
            let mut local: Vec<&ClusterId> = prediction.labels.keys().collect();
            local.sort();
            for id in local {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_votes_for_skips_absent_oracles() {
        let matrix = PredictionMatrix::new()
            .with_oracle("a", OraclePrediction::new().with_label("1", "T cells"))
            .with_oracle("b", OraclePrediction::new().with_label("2", "B cells"))
            .with_oracle("c", OraclePrediction::new().with_label("1", ""));

        let votes: Vec<_> = matrix
            .votes_for("1")
            .map(|(o, l)| (o.to_string(), l.to_string()))
            .collect();
        assert_eq!(
            votes,
            vec![
                ("a".to_string(), "T cells".to_string()),
                ("c".to_string(), String::new())
            ]
        );
    }

    #[test]
    fn test_insert_replaces_but_keeps_position() {
        let matrix = PredictionMatrix::new()
            .with_oracle("a", OraclePrediction::new())
            .with_oracle("b", OraclePrediction::new())
            .with_oracle("a", OraclePrediction::new().with_label("1", "NK cells"));

        let order: Vec<_> = matrix.oracles().map(|o| o.to_string()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(matrix.get("a").unwrap().label("1"), Some("NK cells"));
    }

    #[test]
    fn test_cluster_ids_first_seen() {
        let matrix = PredictionMatrix::new()
            .with_oracle("a", [("2", "x"), ("1", "y")].into_iter().collect())
            .with_oracle("b", [("3", "z"), ("1", "y")].into_iter().collect());

        let ids: Vec<_> = matrix.cluster_ids().iter().map(|c| c.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
