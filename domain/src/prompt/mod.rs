//! Prompt templates for each stage of an annotation run.

mod template;

pub use template::PromptTemplate;
