//! Run Annotation use case
//!
//! Orchestrates one full run: annotation, consensus, discussion of
//! controversial clusters and report assembly. A batch run annotates several
//! marker sets in one prompt per oracle and reconciles each set separately.

use crate::config::RunConfig;
use crate::ports::conversation_logger::{ConversationLogger, NoConversationLogger};
use crate::ports::oracle_gateway::OracleGateway;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::response_cache::{NoCache, ResponseCache};
use crate::use_cases::annotate_clusters::{AnnotateClustersUseCase, AnnotationOutcome};
use crate::use_cases::check_consensus::{CheckConsensusUseCase, ConsensusPolicy};
use crate::use_cases::resolve_controversies::{ResolveControversiesUseCase, ResolveInput};
use crate::use_cases::shared::OracleClient;
use celltype_domain::{ConfigError, ConsensusMode, FinalReport, MarkerSet, OracleFailure, Phase};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum RunAnnotationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("All oracles failed: {}", describe_failures(.failures))]
    AllOraclesFailed { failures: Vec<OracleFailure> },
}

fn describe_failures(failures: &[OracleFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.oracle, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Use case for running a full annotation
pub struct RunAnnotationUseCase<G: OracleGateway + 'static> {
    gateway: Arc<G>,
    cache: Arc<dyn ResponseCache>,
    logger: Arc<dyn ConversationLogger>,
}

impl<G: OracleGateway + 'static> RunAnnotationUseCase<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            cache: Arc::new(NoCache),
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(
        &self,
        config: &RunConfig,
        markers: &MarkerSet,
    ) -> Result<FinalReport, RunAnnotationError> {
        self.execute_with_progress(config, markers, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        config: &RunConfig,
        markers: &MarkerSet,
        progress: &dyn ProgressNotifier,
    ) -> Result<FinalReport, RunAnnotationError> {
        config.validate()?;
        if markers.is_empty() {
            return Err(ConfigError::EmptyMarkerSet.into());
        }
        let client = self.client(config);

        info!(
            "Starting annotation of {} clusters with {} oracles",
            markers.len(),
            config.oracles.len()
        );

        // Phase 1: every oracle annotates every cluster
        let annotation = AnnotateClustersUseCase::new(client.clone())
            .execute(&config.oracles, &config.context, markers, progress)
            .await;

        self.reconcile(&client, config, markers, annotation, progress)
            .await
    }

    /// Annotate several marker sets with one batched prompt per oracle,
    /// then reconcile each set on its own.
    ///
    /// Returns one report per set, in order. The run fails only when no
    /// oracle answered at all.
    pub async fn execute_batch(
        &self,
        config: &RunConfig,
        sets: &[MarkerSet],
        progress: &dyn ProgressNotifier,
    ) -> Result<Vec<FinalReport>, RunAnnotationError> {
        config.validate()?;
        if sets.is_empty() || sets.iter().any(MarkerSet::is_empty) {
            return Err(ConfigError::EmptyMarkerSet.into());
        }
        let client = self.client(config);

        let annotations = AnnotateClustersUseCase::new(client.clone())
            .execute_batch(&config.oracles, &config.context, sets, progress)
            .await;

        let mut reports = Vec::with_capacity(sets.len());
        for (i, (markers, annotation)) in sets.iter().zip(annotations).enumerate() {
            info!("Reconciling marker set {} of {}", i + 1, sets.len());
            reports.push(
                self.reconcile(&client, config, markers, annotation, progress)
                    .await?,
            );
        }
        Ok(reports)
    }

    fn client(&self, config: &RunConfig) -> OracleClient<G> {
        let client = OracleClient::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.cache),
            Arc::clone(&self.logger),
        );
        if config.use_cache {
            client
        } else {
            client.without_cache()
        }
    }

    /// Consensus, discussion and report assembly for one marker set.
    async fn reconcile(
        &self,
        client: &OracleClient<G>,
        config: &RunConfig,
        markers: &MarkerSet,
        annotation: AnnotationOutcome,
        progress: &dyn ProgressNotifier,
    ) -> Result<FinalReport, RunAnnotationError> {
        let mut failures = annotation.failures;
        if annotation.matrix.is_empty() {
            return Err(RunAnnotationError::AllOraclesFailed { failures });
        }

        // Phase 2: consensus from the annotation matrix
        let policy = match config.checker_spec() {
            Some(checker) if config.mode == ConsensusMode::Oracle => {
                ConsensusPolicy::lexical(config.thresholds).with_checker(checker.clone())
            }
            _ => ConsensusPolicy::lexical(config.thresholds),
        };
        let consensus = CheckConsensusUseCase::new(client.clone())
            .execute(&annotation.matrix, &markers.ids(), &policy, Phase::Annotation)
            .await;
        failures.extend(consensus.failures);
        info!(
            "{} of {} clusters are controversial",
            consensus.controversial.len(),
            markers.len()
        );

        // Phase 3: discussion
        let resolved = ResolveControversiesUseCase::new(client.clone())
            .execute(
                ResolveInput {
                    oracles: &config.oracles,
                    context: &config.context,
                    markers,
                    initial_matrix: &annotation.matrix,
                    initial: &consensus.table,
                    controversial: &consensus.controversial,
                    policy: &policy,
                    max_rounds: config.max_discussion_rounds,
                },
                progress,
            )
            .await;
        failures.extend(resolved.failures);

        Ok(FinalReport::assemble(
            markers,
            &consensus.table,
            resolved.records,
            annotation.matrix,
            failures,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::oracle_gateway::OracleError;
    use crate::use_cases::shared::test_support::*;
    use celltype_domain::{
        AnnotationContext, ConsensusMethod, ConsensusThresholds, Credential,
        OracleKind, OracleSpec,
    };

    fn oracles(names: &[&str]) -> Vec<OracleSpec> {
        names
            .iter()
            .map(|n| OracleSpec::new(OracleKind::OpenAi, *n, Credential::new("key")))
            .collect()
    }

    fn config(names: &[&str]) -> RunConfig {
        RunConfig::new(oracles(names), AnnotationContext::new("human").with_tissue("blood"))
    }

    fn markers() -> MarkerSet {
        MarkerSet::new()
            .with_cluster("1", ["CD3D", "CD3E", "IL7R"])
            .with_cluster("2", ["MS4A1", "CD79A"])
            .with_cluster("3", ["GNLY", "NKG7"])
    }

    fn use_case(gateway: &Arc<ScriptedGateway>) -> RunAnnotationUseCase<ScriptedGateway> {
        RunAnnotationUseCase::new(Arc::clone(gateway))
            .with_cache(Arc::new(MemoryCache::default()))
    }

    const ALL_AGREE: &str = "Cluster 1: T cells\nCluster 2: B cells\nCluster 3: NK cells";

    #[tokio::test]
    async fn test_unanimous_cluster_not_controversial() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("gpt", vec![Ok(ALL_AGREE)])
                .script("claude", vec![Ok(ALL_AGREE)])
                .script("gemini", vec![Ok(ALL_AGREE)]),
        );

        let report = use_case(&gateway)
            .execute(&config(&["gpt", "claude", "gemini"]), &markers())
            .await
            .unwrap();

        let nk = report.cluster("3").unwrap();
        assert_eq!(nk.consensus.label, "NK cells");
        assert_eq!(nk.consensus.proportion, 1.0);
        assert_eq!(nk.consensus.entropy, 0.0);
        assert!(!nk.controversial);
        assert!(report.controversial_clusters().is_empty());
        // No discussion needed: one call per oracle
        assert_eq!(gateway.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_paraphrases_go_to_discussion() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script(
                    "gpt",
                    vec![
                        Ok("Cluster 1: T cells\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok("Cluster 1: T cells\nReasoning: CD3D, CD3E and IL7R"),
                    ],
                )
                .script(
                    "claude",
                    vec![
                        Ok("Cluster 1: T lymphocytes\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok("Cluster 1: T cells"),
                    ],
                )
                .script(
                    "gemini",
                    vec![
                        Ok("Cluster 1: CD4+ T cells\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok("Cluster 1: T cells"),
                    ],
                ),
        );

        let report = use_case(&gateway)
            .execute(&config(&["gpt", "claude", "gemini"]), &markers())
            .await
            .unwrap();

        assert_eq!(report.controversial_clusters().len(), 1);
        assert!(report.is_controversial("1"));
        let t = report.cluster("1").unwrap();
        assert!((t.initial.proportion - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(t.consensus.label, "T cells");
        assert_eq!(t.consensus.proportion, 1.0);
        assert_eq!(t.rounds_used, 1);
        assert_eq!(report.label("2"), Some("B cells"));
        let claude = report.model_annotations().get("claude").unwrap();
        assert_eq!(claude.label("1"), Some("T lymphocytes"));
    }

    #[tokio::test]
    async fn test_never_converging_cluster_reports_last_round() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script(
                    "a",
                    vec![
                        Ok("Cluster 1: T cells\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok("Cluster 1: T cells"),
                        Ok("Cluster 1: Monocytes"),
                    ],
                )
                .script(
                    "b",
                    vec![
                        Ok("Cluster 1: NK cells\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok("Cluster 1: NK cells"),
                        Ok("Cluster 1: Monocytes"),
                    ],
                )
                .script(
                    "c",
                    vec![
                        Ok("Cluster 1: B cells\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok("Cluster 1: B cells"),
                        Ok("Cluster 1: Dendritic cells"),
                    ],
                ),
        );
        let config = config(&["a", "b", "c"]).with_max_discussion_rounds(2);

        let report = use_case(&gateway).execute(&config, &markers()).await.unwrap();

        let c1 = report.cluster("1").unwrap();
        assert!(report.is_controversial("1"));
        assert_eq!(c1.rounds_used, 2);
        assert_eq!(c1.discussion.len(), 2);
        assert_eq!(c1.consensus.label, "Monocytes");
        assert!((c1.consensus.proportion - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(c1.consensus, c1.discussion[1].consensus);
        assert_eq!(gateway.call_count("a"), 3);
    }

    #[tokio::test]
    async fn test_failing_oracle_reduces_denominator() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("a", vec![Ok(ALL_AGREE)])
                .script("b", vec![Err(OracleError::Auth("invalid api key".into()))])
                .script("c", vec![Ok(ALL_AGREE)]),
        );

        let report = use_case(&gateway)
            .execute(&config(&["a", "b", "c"]), &markers())
            .await
            .unwrap();

        for cluster in report.clusters() {
            assert_eq!(cluster.consensus.voters, 2);
            assert_eq!(cluster.consensus.proportion, 1.0);
        }
        assert_eq!(report.oracle_failures().len(), 1);
        assert_eq!(report.oracle_failures()[0].oracle.as_str(), "b");
        assert!(report.model_annotations().get("b").is_none());
    }

    #[tokio::test]
    async fn test_cluster_left_out_by_one_oracle_is_not_an_unknown_vote() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("a", vec![Ok(ALL_AGREE)])
                .script("b", vec![Ok(ALL_AGREE)])
                .script("c", vec![Ok("Cluster 1: T cells\nCluster 3: NK cells")]),
        );

        let report = use_case(&gateway)
            .execute(&config(&["a", "b", "c"]), &markers())
            .await
            .unwrap();

        let b = report.cluster("2").unwrap();
        assert_eq!(b.consensus.label, "B cells");
        assert_eq!(b.consensus.voters, 2);
        assert_eq!(b.consensus.proportion, 1.0);
        assert!(!b.controversial);
        assert!(report.controversial_clusters().is_empty());
        assert_eq!(report.model_annotations().get("c").unwrap().label("2"), None);
        assert_eq!(gateway.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_all_oracles_failing_is_an_error() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("a", vec![Err(OracleError::Auth("401".into()))])
                .script("b", vec![Err(OracleError::InvalidModel("404".into()))]),
        );

        let err = use_case(&gateway)
            .execute(&config(&["a", "b"]), &markers())
            .await
            .unwrap_err();

        match err {
            RunAnnotationError::AllOraclesFailed { failures } => {
                let names: Vec<_> = failures.iter().map(|f| f.oracle.as_str()).collect();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_reconciles_each_set() {
        const BATCH: &str = "Set 1:\nCluster 1: T cells\nCluster 2: B cells\nCluster 3: NK cells\n\
                             Set 2:\nCluster 1: Hepatocytes\nCluster 2: Kupffer cells";
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("a", vec![Ok(BATCH)])
                .script("b", vec![Ok(BATCH)]),
        );
        let liver = MarkerSet::new()
            .with_cluster("1", ["ALB", "APOA1"])
            .with_cluster("2", ["CD5L", "MARCO"]);

        let reports = use_case(&gateway)
            .execute_batch(&config(&["a", "b"]), &[markers(), liver], &NoProgress)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].label("1"), Some("T cells"));
        assert_eq!(reports[0].len(), 3);
        assert_eq!(reports[1].label("1"), Some("Hepatocytes"));
        assert_eq!(reports[1].label("2"), Some("Kupffer cells"));
        assert!(reports.iter().all(|r| r.controversial_clusters().is_empty()));
        // One batched call per oracle
        assert_eq!(gateway.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_prompt_template_is_sent() {
        let gateway = Arc::new(ScriptedGateway::new().script("a", vec![Ok(ALL_AGREE)]));
        let mut config = config(&["a"]);
        config.context = config
            .context
            .with_prompt_template("Label these {species} clusters:\n{markers}");

        let report = use_case(&gateway).execute(&config, &markers()).await.unwrap();

        assert_eq!(report.label("2"), Some("B cells"));
        assert_eq!(
            gateway.prompts("a")[0],
            "Label these human clusters:\n\
             Cluster 1: CD3D, CD3E, IL7R\n\
             Cluster 2: MS4A1, CD79A\n\
             Cluster 3: GNLY, NKG7"
        );
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_call() {
        let gateway = Arc::new(ScriptedGateway::new());

        let err = use_case(&gateway)
            .execute(&config(&[]), &markers())
            .await
            .unwrap_err();
        assert!(matches!(err, RunAnnotationError::Config(ConfigError::NoOracles)));

        let err = use_case(&gateway)
            .execute(&config(&["a"]), &MarkerSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunAnnotationError::Config(ConfigError::EmptyMarkerSet)));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oracle_mode_uses_checker_for_paraphrases() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script(
                    "a",
                    vec![
                        Ok("Cluster 1: T cells\nCluster 2: B cells\nCluster 3: NK cells"),
                        Ok(r#"{"label": "T cells", "proportion": 1.0, "entropy": 0.0}"#),
                    ],
                )
                .script(
                    "b",
                    vec![Ok("Cluster 1: T lymphocytes\nCluster 2: B cells\nCluster 3: NK cells")],
                ),
        );
        let config = config(&["a", "b"])
            .with_thresholds(ConsensusThresholds::new(0.7, 0.5).unwrap())
            .with_mode(ConsensusMode::Oracle)
            .with_checker("a");

        let report = use_case(&gateway).execute(&config, &markers()).await.unwrap();

        let c1 = report.cluster("1").unwrap();
        assert!(!c1.controversial);
        assert_eq!(c1.consensus.label, "T cells");
        assert_eq!(c1.consensus.method, ConsensusMethod::Oracle);
        // Unanimous clusters 2 and 3 skipped the checker
        assert_eq!(gateway.call_count("a"), 2);
        assert_eq!(report.cluster("2").unwrap().consensus.method, ConsensusMethod::Lexical);
    }

    #[test]
    fn test_error_lists_failed_oracles() {
        let err = RunAnnotationError::AllOraclesFailed {
            failures: vec![
                OracleFailure::new("gpt-4.1", "Annotation", "authentication failed: 401"),
                OracleFailure::new("grok-3-beta", "Annotation", "invalid model: 404"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("gpt-4.1 (authentication failed: 401)"));
        assert!(msg.contains("grok-3-beta (invalid model: 404)"));
    }
}
