//! Annotate Clusters use case
//!
//! Asks every oracle once for a label per cluster and assembles the
//! prediction matrix. Several marker sets can share one batched prompt, in
//! which case each set gets its own matrix.

use crate::ports::oracle_gateway::OracleGateway;
use crate::ports::progress::ProgressNotifier;
use crate::use_cases::shared::{OracleClient, failure_of, fan_out};
use celltype_domain::{
    AnnotationContext, MarkerSet, OracleFailure, OracleSpec, Phase, PredictionMatrix,
    PromptTemplate, parse_annotation_response, parse_batch_response,
};
use tracing::{debug, info};

/// Output of the annotation phase.
#[derive(Debug, Clone, Default)]
pub struct AnnotationOutcome {
    /// One row per oracle that answered, in configured oracle order
    pub matrix: PredictionMatrix,
    pub failures: Vec<OracleFailure>,
}

/// Use case for the initial annotation pass
pub struct AnnotateClustersUseCase<G: OracleGateway + 'static> {
    client: OracleClient<G>,
}

impl<G: OracleGateway + 'static> AnnotateClustersUseCase<G> {
    pub fn new(client: OracleClient<G>) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        oracles: &[OracleSpec],
        context: &AnnotationContext,
        markers: &MarkerSet,
        progress: &dyn ProgressNotifier,
    ) -> AnnotationOutcome {
        info!(
            "Annotating {} clusters with {} oracles",
            markers.len(),
            oracles.len()
        );

        let prompt = PromptTemplate::annotation(context, markers);
        let clusters = markers.ids();
        let phase = Phase::Annotation;

        let mut outcome = AnnotationOutcome::default();
        for result in fan_out(&self.client, oracles, phase, &prompt, progress).await {
            if let Some(failure) = failure_of(&result, &phase) {
                outcome.failures.push(failure);
                continue;
            }
            if let Ok(lines) = &result.response {
                let prediction = parse_annotation_response(lines, &clusters);
                debug!(
                    "{} labelled {}/{} clusters",
                    result.oracle.name,
                    prediction.iter().filter(|(_, l)| !l.is_empty()).count(),
                    clusters.len()
                );
                outcome.matrix.insert(result.oracle.name, prediction);
            }
        }
        outcome
    }

    /// Annotate several marker sets with one call per oracle.
    ///
    /// Returns one outcome per set, in order. A failed oracle is listed in
    /// every outcome.
    pub async fn execute_batch(
        &self,
        oracles: &[OracleSpec],
        context: &AnnotationContext,
        sets: &[MarkerSet],
        progress: &dyn ProgressNotifier,
    ) -> Vec<AnnotationOutcome> {
        info!(
            "Annotating {} marker sets ({} clusters) with {} oracles",
            sets.len(),
            sets.iter().map(MarkerSet::len).sum::<usize>(),
            oracles.len()
        );

        let prompt = PromptTemplate::batch_annotation(context, sets);
        let clusters: Vec<_> = sets.iter().map(MarkerSet::ids).collect();
        let phase = Phase::Annotation;

        let mut outcomes = vec![AnnotationOutcome::default(); sets.len()];
        for result in fan_out(&self.client, oracles, phase, &prompt, progress).await {
            if let Some(failure) = failure_of(&result, &phase) {
                for outcome in &mut outcomes {
                    outcome.failures.push(failure.clone());
                }
                continue;
            }
            if let Ok(lines) = &result.response {
                let predictions = parse_batch_response(lines, &clusters);
                for (i, (outcome, prediction)) in outcomes.iter_mut().zip(predictions).enumerate() {
                    debug!(
                        "{} labelled {}/{} clusters of set {}",
                        result.oracle.name,
                        prediction.len(),
                        clusters[i].len(),
                        i + 1
                    );
                    outcome.matrix.insert(result.oracle.name.clone(), prediction);
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::oracle_gateway::OracleError;
    use crate::ports::progress::NoProgress;
    use crate::use_cases::shared::test_support::*;
    use celltype_domain::{Credential, OracleKind};
    use std::sync::Arc;

    fn oracle(model: &str) -> OracleSpec {
        OracleSpec::new(OracleKind::OpenAi, model, Credential::new("key"))
    }

    fn markers() -> MarkerSet {
        MarkerSet::new()
            .with_cluster("1", ["CD3D", "CD3E"])
            .with_cluster("2", ["MS4A1", "CD79A"])
    }

    #[tokio::test]
    async fn test_builds_matrix_in_oracle_order() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("m1", vec![Ok("Cluster 1: T cells\nCluster 2: B cells")])
                .script("m2", vec![Ok("T lymphocytes,\nB cells,")])
                .script("m3", vec![Err(OracleError::InvalidModel("404".into()))]),
        );
        let use_case = AnnotateClustersUseCase::new(client(Arc::clone(&gateway)));

        let outcome = use_case
            .execute(
                &[oracle("m1"), oracle("m2"), oracle("m3")],
                &AnnotationContext::new("human"),
                &markers(),
                &NoProgress,
            )
            .await;

        let names: Vec<_> = outcome.matrix.oracles().map(|o| o.as_str()).collect();
        assert_eq!(names, vec!["m1", "m2"]);
        assert_eq!(outcome.matrix.get("m2").unwrap().label("1"), Some("T lymphocytes"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].oracle.as_str(), "m3");
        assert_eq!(outcome.failures[0].phase, "Annotation");

        // Every oracle saw the same prompt listing both clusters
        let prompt = &gateway.prompts("m1")[0];
        assert!(prompt.contains("Cluster 2: MS4A1, CD79A"));
        assert_eq!(gateway.prompts("m2")[0], *prompt);
    }

    #[tokio::test]
    async fn test_batch_splits_answers_per_set() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script(
                    "m1",
                    vec![Ok("Set 1:\nCluster 1: T cells\nCluster 2: B cells\nSet 2:\nCluster 1: Hepatocytes")],
                )
                .script("m2", vec![Err(OracleError::InvalidModel("404".into()))]),
        );
        let use_case = AnnotateClustersUseCase::new(client(Arc::clone(&gateway)));
        let liver = MarkerSet::new().with_cluster("1", ["ALB"]);

        let outcomes = use_case
            .execute_batch(
                &[oracle("m1"), oracle("m2")],
                &AnnotationContext::new("human"),
                &[markers(), liver],
                &NoProgress,
            )
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].matrix.get("m1").unwrap().label("2"), Some("B cells"));
        assert_eq!(outcomes[1].matrix.get("m1").unwrap().label("1"), Some("Hepatocytes"));
        assert!(outcomes.iter().all(|o| o.failures.len() == 1));

        // One call per oracle covering both sets
        assert_eq!(gateway.call_count("m1"), 1);
        let prompt = &gateway.prompts("m1")[0];
        assert!(prompt.contains("Set 2:\nCluster 1: ALB"));
    }
}
