//! Discussion response parsing.
//!
//! Same shape as annotation parsing: a fixed chain of total strategies,
//! ending in a positional fallback.
//!
//! 1. JSON: `{"clusters": [{"id": "1", "cell_type": "...", "reasoning": "..."}]}`
//! 2. Labelled blocks: `Cluster <id>: <label>` then optional `Reasoning: ...`
//! 3. Single cluster: `CELL TYPE: <label>` (only when one cluster was asked)
//! 4. Positional

use crate::annotation::cluster::ClusterId;
use crate::annotation::normalize::split_numbered_prefix;
use crate::annotation::parsing::{extract_json, json_id, normalize_requested, parse_positional};
use crate::annotation::prediction::OraclePrediction;
use serde_json::Value;
use std::collections::HashMap;

/// One oracle's answer to a discussion prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionReply {
    /// Normalized labels for the requested clusters the reply answered
    pub prediction: OraclePrediction,
    pub reasoning: HashMap<ClusterId, String>,
}

impl DiscussionReply {
    pub fn reasoning_for(&self, cluster: &str) -> Option<&str> {
        self.reasoning.get(cluster).map(String::as_str)
    }
}

type Strategy = fn(&[String], &[ClusterId]) -> Option<DiscussionReply>;

const STRATEGIES: &[Strategy] = &[parse_json_reply, parse_labelled_blocks, parse_single_cell_type];

/// Read one discussion reply. Clusters the reply skips get no label.
pub fn parse_discussion_response(lines: &[String], clusters: &[ClusterId]) -> DiscussionReply {
    let raw = STRATEGIES
        .iter()
        .find_map(|strategy| strategy(lines, clusters))
        .unwrap_or_else(|| parse_positional_reply(lines, clusters));

    DiscussionReply {
        prediction: normalize_requested(&raw.prediction, clusters),
        reasoning: raw
            .reasoning
            .into_iter()
            .filter(|(id, text)| clusters.contains(id) && !text.trim().is_empty())
            .collect(),
    }
}

fn parse_json_reply(lines: &[String], clusters: &[ClusterId]) -> Option<DiscussionReply> {
    let value = extract_json(&lines.join("\n"))?;
    let items = value
        .get("clusters")
        .or_else(|| value.get("annotations"))
        .and_then(Value::as_array)?;

    let mut reply = DiscussionReply::default();
    for item in items {
        let Some(id) = item.get("id").or_else(|| item.get("cluster")).and_then(json_id) else {
            continue;
        };
        if !clusters.iter().any(|c| c.as_str() == id) {
            continue;
        }
        if let Some(label) = item.get("cell_type").and_then(Value::as_str) {
            reply.prediction.insert(id.as_str(), label);
        }
        if let Some(reason) = item.get("reasoning").and_then(Value::as_str) {
            reply.reasoning.insert(ClusterId::from(id), reason.trim().to_string());
        }
    }
    (!reply.prediction.is_empty()).then_some(reply)
}

fn parse_labelled_blocks(lines: &[String], clusters: &[ClusterId]) -> Option<DiscussionReply> {
    let mut reply = DiscussionReply::default();
    let mut current: Option<ClusterId> = None;

    for line in lines {
        let line = line.trim().trim_start_matches(['-', '*', ' ']);
        if let Some((id, label)) = split_numbered_prefix(line, "cluster") {
            current = clusters.iter().find(|c| c.as_str() == id).cloned();
            if let Some(cluster) = &current
                && reply.prediction.label(cluster.as_str()).is_none()
            {
                reply.prediction.insert(cluster.clone(), label);
            }
        } else if let Some(cluster) = &current
            && let Some(reason) = strip_keyword(line, "reasoning:")
        {
            append_reasoning(&mut reply.reasoning, cluster, reason);
        }
    }
    (!reply.prediction.is_empty()).then_some(reply)
}

fn parse_single_cell_type(lines: &[String], clusters: &[ClusterId]) -> Option<DiscussionReply> {
    let [cluster] = clusters else {
        return None;
    };

    let mut reply = DiscussionReply::default();
    for line in lines {
        let line = line.trim();
        if let Some(label) = strip_keyword(line, "cell type:")
            && reply.prediction.is_empty()
        {
            reply.prediction.insert(cluster.clone(), label);
        } else if let Some(reason) = strip_keyword(line, "reasoning:") {
            append_reasoning(&mut reply.reasoning, cluster, reason);
        }
    }
    (!reply.prediction.is_empty()).then_some(reply)
}

fn parse_positional_reply(lines: &[String], clusters: &[ClusterId]) -> DiscussionReply {
    let labels: Vec<String> = lines
        .iter()
        .filter(|l| strip_keyword(l.trim(), "reasoning:").is_none())
        .cloned()
        .collect();
    DiscussionReply {
        prediction: parse_positional(&labels, clusters),
        reasoning: HashMap::new(),
    }
}

fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let line = line.trim_matches('*').trim_start();
    let head = line.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| line[keyword.len()..].trim_start_matches('*').trim())
}

fn append_reasoning(reasoning: &mut HashMap<ClusterId, String>, cluster: &ClusterId, text: &str) {
    let entry = reasoning.entry(cluster.clone()).or_default();
    if !entry.is_empty() {
        entry.push(' ');
    }
    entry.push_str(text);
}
