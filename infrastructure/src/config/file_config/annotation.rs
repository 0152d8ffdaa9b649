//! Biological context from TOML (`[annotation]` section)

use celltype_domain::AnnotationContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnnotationConfig {
    /// Species the clusters come from (default: "human")
    pub species: String,
    /// Tissue of origin, e.g. "blood"
    pub tissue: Option<String>,
    /// Free text appended to every prompt
    pub additional_context: Option<String>,
    /// Replaces the built-in annotation prompt. Placeholders: `{species}`,
    /// `{tissue}`, `{context}` and the required `{markers}`
    pub prompt_template: Option<String>,
}

impl Default for FileAnnotationConfig {
    fn default() -> Self {
        Self {
            species: "human".to_string(),
            tissue: None,
            additional_context: None,
            prompt_template: None,
        }
    }
}

impl FileAnnotationConfig {
    pub fn to_context(&self) -> AnnotationContext {
        let mut context = AnnotationContext::new(self.species.trim());
        if let Some(tissue) = non_blank(&self.tissue) {
            context = context.with_tissue(tissue);
        }
        if let Some(extra) = non_blank(&self.additional_context) {
            context = context.with_additional_context(extra);
        }
        if let Some(template) = non_blank(&self.prompt_template) {
            context = context.with_prompt_template(template);
        }
        context
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;

    #[test]
    fn test_annotation_section() {
        let toml_str = r#"
[annotation]
species = "mouse"
tissue = "brain"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let context = config.annotation.to_context();
        assert_eq!(context.species, "mouse");
        assert_eq!(context.tissue.as_deref(), Some("brain"));
        assert_eq!(context.additional_context, None);
    }

    #[test]
    fn test_blank_tissue_is_dropped() {
        let toml_str = r#"
[annotation]
tissue = "  "
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let context = config.annotation.to_context();
        assert_eq!(context.species, "human");
        assert_eq!(context.tissue, None);
    }

    #[test]
    fn test_prompt_template() {
        let toml_str = r#"
[annotation]
species = "mouse"
prompt_template = """
Annotate these {species} clusters:
{markers}
"""
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let context = config.annotation.to_context();
        assert_eq!(
            context.prompt_template.as_deref(),
            Some("Annotate these {species} clusters:\n{markers}")
        );
    }
}
