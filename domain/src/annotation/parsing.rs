//! Annotation response parsing.
//!
//! Oracle output is free text with no contractual structure, so it is read
//! through a fixed chain of strategies. Each strategy is total: it returns
//! `None` ("no match") instead of failing, and the chain always ends with a
//! positional strategy that cannot fail.
//!
//! | Priority | Strategy | Recognises |
//! |----------|----------|------------|
//! | 1 | [`parse_json_annotations`] | JSON object anywhere in the text |
//! | 2 | [`parse_labelled_lines`] | `Cluster <id>: <label>` lines |
//! | 3 | [`parse_positional`] | one label per line, in request order |

use super::cluster::ClusterId;
use super::normalize::{clean_annotation, split_numbered_prefix};
use super::prediction::OraclePrediction;
use serde_json::Value;

type Strategy = fn(&[String], &[ClusterId]) -> Option<OraclePrediction>;

const STRATEGIES: &[Strategy] = &[parse_json_annotations, parse_labelled_lines];

/// Turn an oracle's response lines into a normalized prediction.
///
/// A cluster the matching strategy did not mention is left out, so the
/// oracle casts no vote for it. Only the positional fallback gives every
/// requested cluster a label, using the empty (unknown) label once the
/// lines run out.
pub fn parse_annotation_response(lines: &[String], clusters: &[ClusterId]) -> OraclePrediction {
    let parsed = STRATEGIES
        .iter()
        .find_map(|strategy| strategy(lines, clusters))
        .unwrap_or_else(|| parse_positional(lines, clusters));

    normalize_requested(&parsed, clusters)
}

/// Clean the labels of requested clusters, dropping everything else.
pub(crate) fn normalize_requested(
    parsed: &OraclePrediction,
    clusters: &[ClusterId],
) -> OraclePrediction {
    clusters
        .iter()
        .filter_map(|id| {
            parsed
                .label(id.as_str())
                .map(|label| (id.clone(), clean_annotation(label)))
        })
        .collect()
}

/// Find a JSON object embedded in free text.
///
/// Looks for a fenced code block first, then falls back to the outermost
/// `{ ... }` span.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```")
            && let Ok(value) = serde_json::from_str::<Value>(body[..end].trim())
            && value.is_object()
        {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Render a JSON scalar cluster id (`1` or `"1"`) as a string.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strategy 1: JSON objects.
///
/// Accepted shapes:
/// - `{"annotations": [{"cluster": "1", "cell_type": "T cells"}]}`
/// - `{"clusters": [{"id": 1, "cell_type": "T cells"}]}`
/// - `{"1": "T cells", "2": "B cells"}`
pub fn parse_json_annotations(lines: &[String], clusters: &[ClusterId]) -> Option<OraclePrediction> {
    let value = extract_json(&lines.join("\n"))?;
    let object = value.as_object()?;

    let mut prediction = OraclePrediction::new();
    for (list_key, id_key) in [("annotations", "cluster"), ("clusters", "id")] {
        if let Some(items) = object.get(list_key).and_then(Value::as_array) {
            for item in items {
                let id = item.get(id_key).and_then(json_id);
                let label = item.get("cell_type").and_then(Value::as_str);
                if let (Some(id), Some(label)) = (id, label) {
                    prediction.insert(id, label);
                }
            }
        }
    }

    if prediction.is_empty() {
        for (key, value) in object {
            if let Some(label) = value.as_str()
                && clusters.iter().any(|c| c.as_str() == key)
            {
                prediction.insert(key.as_str(), label);
            }
        }
    }

    (!prediction.is_empty()).then_some(prediction)
}

/// Strategy 2: `Cluster <id>: <label>` lines. Only ids that were asked
/// about are accepted.
pub fn parse_labelled_lines(lines: &[String], clusters: &[ClusterId]) -> Option<OraclePrediction> {
    let mut prediction = OraclePrediction::new();
    for line in lines {
        let line = line.trim().trim_start_matches(['-', '*', ' ']);
        if let Some((id, label)) = split_numbered_prefix(line, "cluster")
            && clusters.iter().any(|c| c.as_str() == id)
            && prediction.label(id).is_none()
        {
            prediction.insert(id, label);
        }
    }
    (!prediction.is_empty()).then_some(prediction)
}

/// Strategy 3 (total): non-empty, non-header lines assigned to clusters in
/// request order.
pub fn parse_positional(lines: &[String], clusters: &[ClusterId]) -> OraclePrediction {
    let mut labels = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter(|l| !is_set_header(l))
        .filter(|l| !l.starts_with("```"));

    clusters
        .iter()
        .map(|id| (id.clone(), labels.next().unwrap_or_default().to_string()))
        .collect()
}

fn is_set_header(line: &str) -> bool {
    matches!(split_numbered_prefix(line, "set"), Some((_, rest)) if rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<ClusterId> {
        ids.iter().map(|s| ClusterId::from(*s)).collect()
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_labelled_lines() {
        let response = lines("Cluster 1: T cells\nCluster 2: B cells,\nCluster 3: \"NK cells\"");
        let p = parse_annotation_response(&response, &ids(&["1", "2", "3"]));
        assert_eq!(p.label("1"), Some("T cells"));
        assert_eq!(p.label("2"), Some("B cells"));
        assert_eq!(p.label("3"), Some("NK cells"));
    }

    #[test]
    fn test_labelled_lines_out_of_order_and_missing() {
        let response = lines("Here you go:\nCluster 3: NK cells\nCluster 1: T cells");
        let p = parse_annotation_response(&response, &ids(&["1", "2", "3"]));
        assert_eq!(p.label("1"), Some("T cells"));
        assert_eq!(p.label("2"), None);
        assert_eq!(p.label("3"), Some("NK cells"));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_json_leaves_out_unmentioned_clusters() {
        let response = lines(r#"{"annotations": [{"cluster": "1", "cell_type": "T cells"}, {"cluster": "9", "cell_type": "Neurons"}]}"#);
        let p = parse_annotation_response(&response, &ids(&["1", "2"]));
        assert_eq!(p.label("1"), Some("T cells"));
        assert_eq!(p.label("2"), None);
        assert_eq!(p.label("9"), None);
    }

    #[test]
    fn test_json_annotations_shape() {
        let response = lines(
            r#"```json
{"annotations": [{"cluster": "1", "cell_type": "T cells"}, {"cluster": 2, "cell_type": "B cells"}]}
```"#,
        );
        let p = parse_annotation_response(&response, &ids(&["1", "2"]));
        assert_eq!(p.label("1"), Some("T cells"));
        assert_eq!(p.label("2"), Some("B cells"));
    }

    #[test]
    fn test_json_clusters_and_flat_shapes() {
        let response = lines(r#"{"clusters": [{"id": 7, "cell_type": "Monocytes"}]}"#);
        let p = parse_annotation_response(&response, &ids(&["7"]));
        assert_eq!(p.label("7"), Some("Monocytes"));

        let response = lines(r#"Result: {"a": "Platelets", "b": "Erythrocytes"}"#);
        let p = parse_annotation_response(&response, &ids(&["a", "b"]));
        assert_eq!(p.label("a"), Some("Platelets"));
        assert_eq!(p.label("b"), Some("Erythrocytes"));
    }

    #[test]
    fn test_positional_fallback() {
        let response = lines("T cells,\n\nB cells,\nNK cells");
        let p = parse_annotation_response(&response, &ids(&["0", "1", "2"]));
        assert_eq!(p.label("0"), Some("T cells"));
        assert_eq!(p.label("1"), Some("B cells"));
        assert_eq!(p.label("2"), Some("NK cells"));
    }

    #[test]
    fn test_positional_short_response_fills_unknown() {
        let response = lines("Set 1:\nT cells");
        let p = parse_annotation_response(&response, &ids(&["1", "2"]));
        assert_eq!(p.label("1"), Some("T cells"));
        assert_eq!(p.label("2"), Some(""));
    }

    #[test]
    fn test_garbage_json_falls_through() {
        let response = lines("{not json}\nMonocytes");
        let p = parse_annotation_response(&response, &ids(&["1", "2"]));
        assert_eq!(p.label("1"), Some("{not json}"));
        assert_eq!(p.label("2"), Some("Monocytes"));
    }

    #[test]
    fn test_extract_json_prefers_fence() {
        let text = "noise {\"x\": 1}\n```json\n{\"y\": 2}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["y"], 2);
    }
}
