//! Prediction normalizer: raw oracle line → canonical annotation string.
//!
//! [`clean_annotation`] is total: anything it cannot make sense of becomes
//! the empty string, which votes as "unknown". The cleaning steps are
//! applied until a fixpoint, so cleaning an already clean label is a no-op.

/// Label reported for a cluster that received no votes at all.
pub const UNRESOLVED_LABEL: &str = "Unresolved";

const LABEL_PREFIXES: &[&str] = &["cell type:", "celltype:", "annotation:", "final cell type:"];
const EXPLANATION_SEPARATORS: &[&str] = &[" - ", " – ", " — ", " because ", " as evidenced by "];
const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
    ('“', '”'),
    ('‘', '’'),
];

/// Clean a raw label string into a canonical annotation.
///
/// # Example
///
/// ```
/// use celltype_domain::annotation::normalize::clean_annotation;
///
/// assert_eq!(clean_annotation("Cluster 3: \"NK cells\","), "NK cells");
/// assert_eq!(clean_annotation("  **B cells**  "), "B cells");
/// assert_eq!(clean_annotation("---"), "");
/// ```
pub fn clean_annotation(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.chars().any(char::is_alphanumeric) {
        current
    } else {
        String::new()
    }
}

/// Voting key: case-insensitive, whitespace-collapsed form of a label.
pub fn label_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn clean_once(s: &str) -> String {
    let mut s = s.trim();

    s = s.trim_matches('*').trim();

    if let Some(rest) = strip_bullet(s) {
        s = rest;
    }

    for keyword in ["cluster", "set"] {
        if let Some((_, rest)) = split_numbered_prefix(s, keyword) {
            s = rest;
        }
    }

    for prefix in LABEL_PREFIXES {
        if s.len() >= prefix.len()
            && s.is_char_boundary(prefix.len())
            && s[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            s = s[prefix.len()..].trim_start();
        }
    }

    for &(open, close) in QUOTE_PAIRS {
        if let Some(inner) = s.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
            s = inner.trim();
        }
    }

    if let Some(pos) = EXPLANATION_SEPARATORS
        .iter()
        .filter_map(|sep| s.find(sep))
        .min()
    {
        s = &s[..pos];
    }

    s.trim_end_matches([',', ';', '.', ':'])
        .trim()
        .to_string()
}

fn strip_bullet(s: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = s.strip_prefix(bullet) {
            return Some(rest.trim_start());
        }
    }

    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &s[digits..];
        for marker in [". ", ") "] {
            if let Some(rest) = rest.strip_prefix(marker) {
                return Some(rest.trim_start());
            }
        }
    }
    None
}

/// Split `"<keyword> <id>: rest"` (case-insensitive keyword, `:` or `-`
/// separator) into `(id, rest)`.
///
/// # Example
///
/// ```
/// use celltype_domain::annotation::normalize::split_numbered_prefix;
///
/// assert_eq!(split_numbered_prefix("Cluster 12: T cells", "cluster"), Some(("12", "T cells")));
/// assert_eq!(split_numbered_prefix("Set 1:", "set"), Some(("1", "")));
/// assert_eq!(split_numbered_prefix("T cells", "cluster"), None);
/// ```
pub fn split_numbered_prefix<'a>(s: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let s = s.trim_start();
    if s.len() <= keyword.len()
        || !s.is_char_boundary(keyword.len())
        || !s[..keyword.len()].eq_ignore_ascii_case(keyword)
    {
        return None;
    }

    let after_keyword = &s[keyword.len()..];
    if !after_keyword.starts_with(char::is_whitespace) {
        return None;
    }
    let after_keyword = after_keyword.trim_start();

    let id_len = after_keyword
        .find(|c: char| c == ':' || c.is_whitespace())
        .unwrap_or(after_keyword.len());
    if id_len == 0 {
        return None;
    }
    let id = after_keyword[..id_len].trim_matches(|c: char| c == '#' || c == '*');
    if id.is_empty() {
        return None;
    }

    let rest = after_keyword[id_len..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('-'))?;
    Some((id, rest.trim_matches(|c: char| c == '*' || c.is_whitespace())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_cluster_prefix() {
        assert_eq!(clean_annotation("Cluster 1: T cells"), "T cells");
        assert_eq!(clean_annotation("cluster 7 - Monocytes"), "Monocytes");
        assert_eq!(clean_annotation("Set 2: Cluster 3: NK cells"), "NK cells");
    }

    #[test]
    fn test_strips_quotes_and_separators() {
        assert_eq!(clean_annotation("\"CD4+ T cells\","), "CD4+ T cells");
        assert_eq!(clean_annotation("'Plasma cells';"), "Plasma cells");
        assert_eq!(clean_annotation("“Erythrocytes”."), "Erythrocytes");
    }

    #[test]
    fn test_strips_explanatory_suffix() {
        assert_eq!(
            clean_annotation("NK cells - high NKG7 and GNLY expression"),
            "NK cells"
        );
        assert_eq!(
            clean_annotation("B cells because of MS4A1"),
            "B cells"
        );
    }

    #[test]
    fn test_strips_bullets_and_emphasis() {
        assert_eq!(clean_annotation("- **Dendritic cells**"), "Dendritic cells");
        assert_eq!(clean_annotation("3. Macrophages"), "Macrophages");
        assert_eq!(clean_annotation("Cell type: Platelets"), "Platelets");
    }

    #[test]
    fn test_unparseable_yields_empty() {
        assert_eq!(clean_annotation(""), "");
        assert_eq!(clean_annotation("   "), "");
        assert_eq!(clean_annotation(",,,"), "");
        assert_eq!(clean_annotation("Cluster 4:"), "");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "Cluster 1: \"T cells\",",
            "- **CD8+ T cells**.",
            "NK cells - cytotoxic",
            "CD4+ T cells",
            "Set 1: Cluster 2: 'B cells';",
            "γδ T cells",
        ];
        for input in inputs {
            let once = clean_annotation(input);
            assert_eq!(clean_annotation(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_label_key_collapses_case_and_whitespace() {
        assert_eq!(label_key("  NK   Cells "), "nk cells");
        assert_eq!(label_key("nk cells"), label_key("NK cells"));
        assert_ne!(label_key("T cells"), label_key("T lymphocytes"));
    }

    #[test]
    fn test_split_numbered_prefix_rejects_non_prefixes() {
        assert_eq!(split_numbered_prefix("Clusterin-high cells", "cluster"), None);
        assert_eq!(split_numbered_prefix("Cluster of T cells", "cluster"), None);
        assert_eq!(
            split_numbered_prefix("CLUSTER a1:Monocytes", "cluster"),
            Some(("a1", "Monocytes"))
        );
    }
}
