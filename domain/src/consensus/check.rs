//! Oracle-checked consensus.
//!
//! A checker oracle sees every model's label for a cluster and reports its
//! own consensus label, proportion and entropy. Its answer is only trusted
//! after validation; anything else is "no answer" and the caller falls back
//! to lexical voting.

use super::result::{ConsensusMethod, ConsensusResult};
use crate::annotation::normalize::clean_annotation;
use crate::annotation::parsing::extract_json;
use serde_json::Value;

/// A validated consensus judgement from a checker oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedConsensus {
    pub label: String,
    pub proportion: f64,
    pub entropy: f64,
}

impl CheckedConsensus {
    /// Convert into a round result, keeping the voter count of the matrix
    /// it was judged from.
    pub fn into_result(self, voters: usize) -> ConsensusResult {
        ConsensusResult {
            label: self.label,
            proportion: self.proportion,
            entropy: self.entropy,
            voters,
            method: ConsensusMethod::Oracle,
        }
    }

    fn validated(label: &str, proportion: f64, entropy: f64) -> Option<Self> {
        let label = clean_annotation(label);
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        (!label.is_empty() && in_range(proportion) && in_range(entropy)).then_some(Self {
            label,
            proportion,
            entropy,
        })
    }
}

/// Parse a checker response.
///
/// Accepts `{"label": ..., "proportion": ..., "entropy": ...}` anywhere in
/// the text, or the four-line form:
///
/// ```text
/// 1
/// 0.67
/// 0.92
/// T cells
/// ```
///
/// (consensus flag, proportion, entropy, label). Returns `None` when the
/// response is unparseable or out of range.
pub fn parse_consensus_check(lines: &[String]) -> Option<CheckedConsensus> {
    parse_json_check(lines).or_else(|| parse_line_check(lines))
}

fn parse_json_check(lines: &[String]) -> Option<CheckedConsensus> {
    let value = extract_json(&lines.join("\n"))?;
    let label = value
        .get("label")
        .or_else(|| value.get("consensus"))
        .and_then(Value::as_str)?;
    let proportion = number(value.get("proportion")?)?;
    let entropy = number(value.get("entropy")?)?;
    CheckedConsensus::validated(label, proportion, entropy)
}

fn parse_line_check(lines: &[String]) -> Option<CheckedConsensus> {
    let mut fields = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());
    let _flag = fields.next()?;
    let proportion = fields.next()?.parse::<f64>().ok()?;
    let entropy = fields.next()?.parse::<f64>().ok()?;
    let label = fields.next()?;
    CheckedConsensus::validated(label, proportion, entropy)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
