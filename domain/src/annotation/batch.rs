//! Batched annotation: several marker sets answered in one response.
//!
//! Sets are numbered from 1 in request order. A response is split by
//! `Set <n>:` header lines first; without headers the JSON shapes
//! `{"sets": [{"clusters": [...]}, ...]}` and
//! `{"annotations": [{"set": 1, "cluster": "0", "cell_type": "..."}]}` are
//! tried. Each section is then read like a single-set response.

use super::cluster::ClusterId;
use super::normalize::split_numbered_prefix;
use super::parsing::{extract_json, json_id, normalize_requested, parse_annotation_response};
use super::prediction::OraclePrediction;
use serde_json::Value;
use std::collections::BTreeMap;

/// Split a batched response into one prediction per set.
///
/// The result always has `sets.len()` entries. A set the response never
/// reaches gets an empty prediction, so the oracle casts no vote for any of
/// its clusters.
pub fn parse_batch_response(lines: &[String], sets: &[Vec<ClusterId>]) -> Vec<OraclePrediction> {
    if sets.len() == 1 {
        return vec![parse_annotation_response(lines, &sets[0])];
    }

    if let Some(sections) = split_set_sections(lines) {
        return sets
            .iter()
            .enumerate()
            .map(|(i, clusters)| match sections.get(&(i + 1)) {
                Some(section) => parse_annotation_response(section, clusters),
                None => OraclePrediction::new(),
            })
            .collect();
    }

    let mut parsed = parse_json_sets(lines).unwrap_or_default();
    sets.iter()
        .enumerate()
        .map(|(i, clusters)| match parsed.remove(&(i + 1)) {
            Some(prediction) => normalize_requested(&prediction, clusters),
            None => OraclePrediction::new(),
        })
        .collect()
}

/// Lines under each `Set <n>:` header, keyed by set number.
fn split_set_sections(lines: &[String]) -> Option<BTreeMap<usize, Vec<String>>> {
    let mut sections: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut current = None;

    for line in lines {
        let trimmed = line.trim().trim_start_matches(['#', '*', ' ']);
        if let Some((id, rest)) = split_numbered_prefix(trimmed, "set")
            && rest.is_empty()
            && let Ok(number) = id.parse::<usize>()
        {
            current = Some(number);
            sections.entry(number).or_default();
            continue;
        }
        if let Some(number) = current {
            sections.entry(number).or_default().push(line.clone());
        }
    }

    (!sections.is_empty()).then_some(sections)
}

fn parse_json_sets(lines: &[String]) -> Option<BTreeMap<usize, OraclePrediction>> {
    let value = extract_json(&lines.join("\n"))?;
    let object = value.as_object()?;
    let mut parsed: BTreeMap<usize, OraclePrediction> = BTreeMap::new();

    if let Some(sets) = object.get("sets").and_then(Value::as_array) {
        for (i, set) in sets.iter().enumerate() {
            let number = set
                .get("set")
                .and_then(json_id)
                .and_then(|id| id.parse().ok())
                .unwrap_or(i + 1);
            let prediction = parsed.entry(number).or_default();
            for item in set.get("clusters").and_then(Value::as_array).into_iter().flatten() {
                let id = item.get("id").or_else(|| item.get("cluster")).and_then(json_id);
                let label = item.get("cell_type").and_then(Value::as_str);
                if let (Some(id), Some(label)) = (id, label) {
                    prediction.insert(id, label);
                }
            }
        }
    } else if let Some(items) = object.get("annotations").and_then(Value::as_array) {
        for item in items {
            let number = item.get("set").and_then(json_id).and_then(|id| id.parse().ok());
            let id = item.get("cluster").and_then(json_id);
            let label = item.get("cell_type").and_then(Value::as_str);
            if let (Some(number), Some(id), Some(label)) = (number, id, label) {
                parsed.entry(number).or_default().insert(id, label);
            }
        }
    }

    (!parsed.is_empty()).then_some(parsed)
}
