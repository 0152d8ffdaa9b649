//! Marker gene files.
//!
//! Two formats are accepted:
//! - JSON: `{"<cluster>": ["GENE", ...], ...}`, clusters kept in document order
//! - CSV/TSV: a header naming `cluster` and `gene` columns (anywhere in the
//!   row, as in a marker table export) or bare `cluster,gene` rows; clusters
//!   kept in order of first appearance

use celltype_domain::MarkerSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerFileError {
    #[error("Could not read marker file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid marker JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid marker CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("Marker file {0} contains no clusters")]
    Empty(PathBuf),
}

/// Load a marker file, choosing the format by extension (`.csv` / `.tsv`)
/// and falling back to sniffing the content.
pub fn load_markers(path: &Path) -> Result<MarkerSet, MarkerFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| MarkerFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    let is_csv = match extension.as_deref() {
        Some("csv") | Some("tsv") => true,
        Some("json") => false,
        _ => !content.trim_start().starts_with('{'),
    };

    let markers = if is_csv {
        parse_markers_csv(&content)?
    } else {
        parse_markers_json(&content)?
    };

    if markers.is_empty() {
        return Err(MarkerFileError::Empty(path.to_path_buf()));
    }
    Ok(markers)
}

pub fn parse_markers_json(content: &str) -> Result<MarkerSet, MarkerFileError> {
    Ok(serde_json::from_str(content)?)
}

/// Where the cluster and gene values sit in each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    cluster: usize,
    gene: usize,
    /// Header width; rows one wider carry a leading row-name column
    header_width: Option<usize>,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        cluster: 0,
        gene: 1,
        header_width: None,
    };

    /// Locate `cluster` and `gene` by name. `None` when the row is not a
    /// header at all.
    fn from_header(fields: &[&str], line: usize) -> Option<Result<Self, MarkerFileError>> {
        let find = |names: &[&str]| {
            fields
                .iter()
                .position(|f| names.iter().any(|n| f.eq_ignore_ascii_case(n)))
        };
        let cluster = find(&["cluster", "cluster_id", "seurat_clusters"])?;
        let Some(gene) = find(&["gene", "genes", "gene_name", "gene_symbol", "marker"]) else {
            return Some(Err(MarkerFileError::Csv {
                line,
                message: "header has a cluster column but no gene column".to_string(),
            }));
        };
        Some(Ok(Self {
            cluster,
            gene,
            header_width: Some(fields.len()),
        }))
    }

    fn pick<'a>(&self, fields: &[&'a str]) -> Option<(&'a str, &'a str)> {
        let offset = match self.header_width {
            Some(width) if fields.len() == width + 1 => 1,
            _ => 0,
        };
        Some((
            *fields.get(self.cluster + offset)?,
            *fields.get(self.gene + offset)?,
        ))
    }
}

/// Parse delimited marker rows, such as a marker table export.
///
/// The first non-comment row is a header when it names a `cluster` column;
/// the `cluster` and `gene` columns are then found by name wherever they
/// sit. Without a header the first two columns are `cluster,gene`. Tabs are
/// accepted as separators.
pub fn parse_markers_csv(content: &str) -> Result<MarkerSet, MarkerFileError> {
    let mut markers = MarkerSet::new();
    let mut columns: Option<Columns> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let number = index + 1;
        let separator = if line.contains('\t') { '\t' } else { ',' };
        let fields = split_fields(line, separator);

        let layout = match columns {
            Some(layout) => layout,
            None => match Columns::from_header(&fields, number) {
                Some(header) => {
                    columns = Some(header?);
                    continue;
                }
                None => *columns.insert(Columns::POSITIONAL),
            },
        };

        let Some((cluster, gene)) = layout.pick(&fields) else {
            return Err(MarkerFileError::Csv {
                line: number,
                message: "missing cluster or gene column".to_string(),
            });
        };
        if cluster.is_empty() {
            return Err(MarkerFileError::Csv {
                line: number,
                message: "empty cluster id".to_string(),
            });
        }
        if gene.is_empty() {
            continue;
        }
        markers.insert(cluster, [gene]);
    }

    Ok(markers)
}

/// Split one row, honouring double-quoted fields.
fn split_fields(line: &str, separator: char) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            fields.push(unquote(&line[start..i]));
            start = i + c.len_utf8();
        }
    }
    fields.push(unquote(&line[start..]));
    fields
}

fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ids(markers: &MarkerSet) -> Vec<String> {
        markers.ids().iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_csv_groups_by_first_appearance() {
        let csv = "cluster,gene\n2,MS4A1\n0,CD3E\n2,CD79A\n\"0\",\"CD3D\"\n";
        let markers = parse_markers_csv(csv).unwrap();
        assert_eq!(ids(&markers), vec!["2", "0"]);
        assert_eq!(markers.markers("2").unwrap(), ["MS4A1", "CD79A"]);
        assert_eq!(markers.markers("0").unwrap(), ["CD3E", "CD3D"]);
    }

    #[test]
    fn test_csv_without_header_and_with_tabs() {
        let markers = parse_markers_csv("1\tNKG7\n1\tGNLY\n").unwrap();
        assert_eq!(markers.markers("1").unwrap(), ["NKG7", "GNLY"]);
    }

    #[test]
    fn test_csv_rejects_single_column() {
        let err = parse_markers_csv("cluster,gene\n1\n").unwrap_err();
        assert!(matches!(err, MarkerFileError::Csv { line: 2, .. }));
    }

    #[test]
    fn test_csv_header_after_comment() {
        let markers = parse_markers_csv("# exported markers\ncluster,gene\n0,CD3D\n").unwrap();
        assert_eq!(ids(&markers), vec!["0"]);
        assert_eq!(markers.markers("0").unwrap(), ["CD3D"]);
    }

    #[test]
    fn test_csv_finds_columns_by_name() {
        let csv = "p_val,avg_log2FC,pct.1,pct.2,p_val_adj,cluster,gene\n\
                   0.001,2.1,0.9,0.1,0.01,0,CD3D\n\
                   0.002,1.8,0.8,0.2,0.02,0,IL7R\n\
                   0.003,2.5,0.9,0.1,0.03,1,MS4A1\n";
        let markers = parse_markers_csv(csv).unwrap();
        assert_eq!(ids(&markers), vec!["0", "1"]);
        assert_eq!(markers.markers("0").unwrap(), ["CD3D", "IL7R"]);
        assert_eq!(markers.markers("1").unwrap(), ["MS4A1"]);
    }

    #[test]
    fn test_tsv_header_with_row_names() {
        // Rows carry a leading row name the header does not list
        let tsv = "\"p_val\"\t\"cluster\"\t\"gene\"\n\
                   \"CD3D\"\t0.001\t\"0\"\t\"CD3D\"\n\
                   \"LYZ\"\t0.002\t\"3\"\t\"LYZ\"\n";
        let markers = parse_markers_csv(tsv).unwrap();
        assert_eq!(ids(&markers), vec!["0", "3"]);
        assert_eq!(markers.markers("3").unwrap(), ["LYZ"]);
    }

    #[test]
    fn test_csv_quoted_field_with_separator() {
        let markers = parse_markers_csv("cluster,gene,note\n2,MS4A1,\"B, naive\"\n").unwrap();
        assert_eq!(markers.markers("2").unwrap(), ["MS4A1"]);
    }

    #[test]
    fn test_csv_header_without_gene_column() {
        let err = parse_markers_csv("cluster,p_val\n0,0.01\n").unwrap_err();
        assert!(matches!(err, MarkerFileError::Csv { line: 1, .. }));
    }

    #[test]
    fn test_json_keeps_document_order() {
        let markers = parse_markers_json(r#"{"10": ["CD14"], "2": ["CD3E", "CD8A"]}"#).unwrap();
        assert_eq!(ids(&markers), vec!["10", "2"]);
    }

    #[test]
    fn test_load_sniffs_format() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("markers.txt");
        std::fs::File::create(&json_path)
            .unwrap()
            .write_all(br#"{"0": ["CD3E"]}"#)
            .unwrap();
        assert_eq!(ids(&load_markers(&json_path).unwrap()), vec!["0"]);

        let csv_path = dir.path().join("markers.csv");
        std::fs::write(&csv_path, "cluster,gene\n5,LYZ\n").unwrap();
        assert_eq!(ids(&load_markers(&csv_path).unwrap()), vec!["5"]);
    }

    #[test]
    fn test_load_rejects_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(load_markers(&path), Err(MarkerFileError::Empty(_))));

        assert!(matches!(
            load_markers(&dir.path().join("missing.csv")),
            Err(MarkerFileError::Io { .. })
        ));
    }
}
