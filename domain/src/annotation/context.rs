use serde::{Deserialize, Serialize};

/// Biological context shared by every prompt in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationContext {
    pub species: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tissue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    /// Replaces the built-in annotation prompt; see
    /// [`PromptTemplate::annotation`](crate::prompt::PromptTemplate::annotation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl AnnotationContext {
    pub fn new(species: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            tissue: None,
            additional_context: None,
            prompt_template: None,
        }
    }

    pub fn with_tissue(mut self, tissue: impl Into<String>) -> Self {
        self.tissue = Some(tissue.into());
        self
    }

    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// "human blood" / "human"
    pub fn describe(&self) -> String {
        match self.tissue.as_deref().map(str::trim) {
            Some(tissue) if !tissue.is_empty() => format!("{} {}", self.species, tissue),
            _ => self.species.clone(),
        }
    }
}

impl Default for AnnotationContext {
    fn default() -> Self {
        Self::new("human")
    }
}
