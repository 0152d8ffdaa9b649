//! Prompt templates for annotation, discussion and consensus checking

use crate::annotation::cluster::{ClusterId, MarkerSet};
use crate::annotation::context::AnnotationContext;
use crate::annotation::prediction::PredictionMatrix;
use crate::core::error::ConfigError;
use crate::discussion::record::ControversyRecord;
use crate::oracle::spec::OracleName;
use std::fmt::Write;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Initial annotation prompt covering every cluster in `markers`.
    ///
    /// A custom [`AnnotationContext::prompt_template`] replaces the built-in
    /// wording; see [`render_custom`](Self::render_custom).
    pub fn annotation(context: &AnnotationContext, markers: &MarkerSet) -> String {
        let mut listing = String::new();
        push_marker_lines(&mut listing, markers);

        if let Some(template) = &context.prompt_template {
            return Self::render_custom(template, context, &listing);
        }

        let mut prompt = format!(
            "You are an expert in single-cell RNA sequencing analysis.\n\
             Identify the most likely cell type for each {} cluster below, \
             based on its marker genes.\n",
            context.describe()
        );
        push_additional_context(&mut prompt, context);

        prompt.push_str("\nMarker genes:\n");
        prompt.push_str(&listing);

        prompt.push_str(
            "\nAnswer with exactly one line per cluster, in the same order, formatted as\n\
             Cluster <id>: <cell type>\n\
             Give only the cell type name, without explanations.",
        );
        prompt
    }

    /// One prompt covering several marker sets, numbered from 1.
    ///
    /// Markers are listed under `Set <n>:` headers and the answer is asked
    /// for in the same layout. A custom template receives the sectioned
    /// listing as `{markers}`.
    pub fn batch_annotation(context: &AnnotationContext, sets: &[MarkerSet]) -> String {
        let mut listing = String::new();
        for (i, markers) in sets.iter().enumerate() {
            let _ = writeln!(listing, "Set {}:", i + 1);
            push_marker_lines(&mut listing, markers);
            listing.push('\n');
        }

        if let Some(template) = &context.prompt_template {
            return Self::render_custom(template, context, listing.trim_end());
        }

        let mut prompt = format!(
            "You are an expert in single-cell RNA sequencing analysis.\n\
             Identify the most likely cell type for each {} cluster below, \
             based on its marker genes. The clusters come in {} independent sets; \
             cluster ids may repeat across sets.\n",
            context.describe(),
            sets.len()
        );
        push_additional_context(&mut prompt, context);

        prompt.push_str("\nMarker genes:\n");
        prompt.push_str(&listing);

        prompt.push_str(
            "Answer set by set. Start each set with its header line (Set <n>:), \
             then give exactly one line per cluster formatted as\n\
             Cluster <id>: <cell type>\n\
             Give only the cell type name, without explanations.",
        );
        prompt
    }

    /// Fill a user-supplied annotation template.
    ///
    /// | Placeholder | Value |
    /// |-------------|-------|
    /// | `{species}` | species |
    /// | `{tissue}` | tissue, or empty |
    /// | `{context}` | additional context, or empty |
    /// | `{markers}` | `Cluster <id>: <genes>` lines |
    pub fn render_custom(template: &str, context: &AnnotationContext, markers: &str) -> String {
        template
            .replace("{species}", &context.species)
            .replace("{tissue}", context.tissue.as_deref().unwrap_or_default())
            .replace(
                "{context}",
                context.additional_context.as_deref().unwrap_or_default(),
            )
            .replace("{markers}", markers.trim_end())
    }

    /// A custom template must show the oracle the marker genes.
    pub fn validate_custom(template: &str) -> Result<(), ConfigError> {
        if template.contains("{markers}") {
            Ok(())
        } else {
            Err(ConfigError::PromptTemplateWithoutMarkers)
        }
    }

    /// Discussion prompt for a batch of controversial clusters.
    ///
    /// Each cluster lists its markers and every oracle's latest label. From
    /// round 2 onward the previous round's reasoning is included.
    pub fn discussion(
        context: &AnnotationContext,
        markers: &MarkerSet,
        records: &[&ControversyRecord],
        initial: &PredictionMatrix,
        round: usize,
    ) -> String {
        let mut prompt = format!(
            "You are an expert in single-cell RNA sequencing analysis taking part in \
             discussion round {} about {} clusters where several experts disagree.\n\
             Review the marker genes and the other experts' answers, then give your \
             own best cell type for each cluster.\n",
            round,
            context.describe()
        );
        push_additional_context(&mut prompt, context);

        for record in records {
            let id = &record.cluster;
            let genes = markers.markers(id.as_str()).unwrap_or_default().join(", ");
            let _ = write!(prompt, "\n## Cluster {}\nMarker genes: {}\n", id, genes);

            prompt.push_str("Current answers:\n");
            match record.last_spoken_round() {
                Some(previous) => {
                    for s in &previous.statements {
                        let _ = writeln!(prompt, "- {}: {}", s.oracle, display_label(&s.label));
                    }
                }
                None => {
                    for (oracle, label) in initial.votes_for(id.as_str()) {
                        let _ = writeln!(prompt, "- {}: {}", oracle, display_label(label));
                    }
                }
            }

            if round > 1
                && let Some(previous) = record.last_spoken_round()
            {
                let _ = writeln!(prompt, "Discussion from round {}:", previous.round);
                for s in &previous.statements {
                    if let Some(reason) = &s.reasoning {
                        let _ = writeln!(prompt, "- {}: {}", s.oracle, reason);
                    }
                }
            }
        }

        prompt.push_str(
            "\nFor every cluster above, answer in this format:\n\
             Cluster <id>: <cell type>\n\
             Reasoning: <one or two sentences>",
        );
        prompt
    }

    /// Ask a checker oracle to judge agreement between labels for one cluster.
    pub fn consensus_check(cluster: &ClusterId, votes: &[(&OracleName, &str)]) -> String {
        let mut prompt = format!(
            "Several experts annotated single-cell cluster {}. Decide whether they agree, \
             treating synonyms and different levels of detail for the same cell type as \
             agreement.\n\nAnswers:\n",
            cluster
        );
        for (oracle, label) in votes {
            let _ = writeln!(prompt, "- {}: {}", oracle, display_label(label));
        }
        prompt.push_str(
            "\nReply with a JSON object only:\n\
             {\"consensus\": true|false, \"label\": \"<majority cell type>\", \
             \"proportion\": <share of experts agreeing with it, 0-1>, \
             \"entropy\": <normalized Shannon entropy of the answers, 0-1>}",
        );
        prompt
    }
}

fn push_marker_lines(prompt: &mut String, markers: &MarkerSet) {
    for cluster in markers.iter() {
        let _ = writeln!(prompt, "Cluster {}: {}", cluster.id, cluster.markers.join(", "));
    }
}

fn push_additional_context(prompt: &mut String, context: &AnnotationContext) {
    if let Some(extra) = context.additional_context.as_deref().map(str::trim)
        && !extra.is_empty()
    {
        let _ = writeln!(prompt, "Additional context: {}", extra);
    }
}

fn display_label(label: &str) -> &str {
    if label.is_empty() { "(no answer)" } else { label }
}
