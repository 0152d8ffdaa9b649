//! Resolve Controversies use case
//!
//! Bounded discussion rounds for clusters that failed the consensus
//! thresholds. Each round:
//!
//! 1. one batched discussion prompt listing every still-open cluster goes to
//!    every oracle,
//! 2. consensus is recomputed from this round's answers only,
//! 3. clusters that now pass both thresholds are resolved.
//!
//! A round in which every oracle fails is skipped but still spends budget.
//! The same goes, per cluster, for a round in which every reply left that
//! cluster out.
//! Clusters still open when the budget runs out are resolved with the last
//! round's consensus.

use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::oracle_gateway::OracleGateway;
use crate::ports::progress::ProgressNotifier;
use crate::use_cases::check_consensus::{CheckConsensusUseCase, ConsensusPolicy};
use crate::use_cases::shared::{OracleClient, failure_of, fan_out};
use celltype_domain::{
    AnnotationContext, ClusterId, ConsensusResult, ConsensusTable, ControversyRecord, DiscussionReply, MarkerSet,
    OracleFailure, OracleName, OracleSpec, OracleStatement, Phase, PredictionMatrix,
    PromptTemplate, parse_discussion_response,
};
use tracing::{debug, info, warn};

/// Input for the ResolveControversies use case
pub struct ResolveInput<'a> {
    pub oracles: &'a [OracleSpec],
    pub context: &'a AnnotationContext,
    pub markers: &'a MarkerSet,
    /// Predictions from the annotation pass, shown in round 1
    pub initial_matrix: &'a PredictionMatrix,
    /// Consensus from the annotation pass
    pub initial: &'a ConsensusTable,
    pub controversial: &'a [ClusterId],
    pub policy: &'a ConsensusPolicy,
    pub max_rounds: usize,
}

/// Resolver output: one resolved record per controversial cluster.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    pub records: Vec<ControversyRecord>,
    pub failures: Vec<OracleFailure>,
}

/// Use case for the discussion loop
pub struct ResolveControversiesUseCase<G: OracleGateway + 'static> {
    client: OracleClient<G>,
    consensus: CheckConsensusUseCase<G>,
}

impl<G: OracleGateway + 'static> ResolveControversiesUseCase<G> {
    pub fn new(client: OracleClient<G>) -> Self {
        Self {
            consensus: CheckConsensusUseCase::new(client.clone()),
            client,
        }
    }

    pub async fn execute(
        &self,
        input: ResolveInput<'_>,
        progress: &dyn ProgressNotifier,
    ) -> ResolveOutcome {
        let mut records: Vec<ControversyRecord> = input
            .controversial
            .iter()
            .map(|id| {
                let initial = input
                    .initial
                    .get(id.as_str())
                    .cloned()
                    .unwrap_or_else(ConsensusResult::unresolved);
                ControversyRecord::new(id.clone(), initial)
            })
            .collect();
        let mut failures = Vec::new();

        if !records.is_empty() {
            info!(
                "Discussing {} controversial clusters (up to {} rounds)",
                records.len(),
                input.max_rounds
            );
        }

        for round in 1..=input.max_rounds {
            let open: Vec<usize> = (0..records.len())
                .filter(|&i| !records[i].is_resolved())
                .collect();
            if open.is_empty() {
                break;
            }

            let phase = Phase::Discussion { round };
            let clusters: Vec<ClusterId> =
                open.iter().map(|&i| records[i].cluster.clone()).collect();
            for &i in &open {
                records[i].begin_round();
            }

            let prompt = {
                let open_records: Vec<&ControversyRecord> =
                    open.iter().map(|&i| &records[i]).collect();
                PromptTemplate::discussion(
                    input.context,
                    input.markers,
                    &open_records,
                    input.initial_matrix,
                    round,
                )
            };

            let mut matrix = PredictionMatrix::new();
            let mut replies: Vec<(OracleName, DiscussionReply)> = Vec::new();
            for result in fan_out(&self.client, input.oracles, phase, &prompt, progress).await {
                if let Some(failure) = failure_of(&result, &phase) {
                    failures.push(failure);
                    continue;
                }
                if let Ok(lines) = &result.response {
                    let reply = parse_discussion_response(lines, &clusters);
                    matrix.insert(result.oracle.name.clone(), reply.prediction.clone());
                    replies.push((result.oracle.name, reply));
                }
            }

            if matrix.is_empty() {
                warn!("Every oracle failed in discussion round {}; skipping", round);
                for &i in &open {
                    records[i].skip_round(round);
                }
                self.client
                    .logger()
                    .log(ConversationEvent::discussion_round(round, &clusters, 0, true));
                continue;
            }

            let outcome = self
                .consensus
                .execute(&matrix, &clusters, input.policy, phase)
                .await;
            failures.extend(outcome.failures);

            for &i in &open {
                let record = &mut records[i];
                let Some(consensus) = outcome.table.get(record.cluster.as_str()).cloned() else {
                    continue;
                };
                // Every reply left this cluster out
                if consensus.is_unresolved() {
                    debug!("No oracle answered cluster {} in round {}", record.cluster, round);
                    record.skip_round(round);
                    continue;
                }
                let statements = replies
                    .iter()
                    .filter_map(|(oracle, reply)| {
                        let label = reply.prediction.label(record.cluster.as_str())?;
                        let statement = OracleStatement::new(oracle.clone(), label);
                        Some(match reply.reasoning_for(record.cluster.as_str()) {
                            Some(reason) => statement.with_reasoning(reason),
                            None => statement,
                        })
                    })
                    .collect();

                let converged = !outcome.controversial.contains(&record.cluster);
                record.record_round(round, statements, consensus, converged);

                if converged {
                    debug!("Cluster {} resolved in round {}", record.cluster, round);
                    progress.on_cluster_resolved(&record.cluster, record.current(), round);
                    self.client.logger().log(ConversationEvent::cluster_resolved(
                        &record.cluster,
                        record.current(),
                        record.rounds_used(),
                        true,
                    ));
                }
            }

            self.client.logger().log(ConversationEvent::discussion_round(
                round,
                &clusters,
                replies.len(),
                false,
            ));
        }

        for record in records.iter_mut().filter(|r| !r.is_resolved()) {
            record.close();
            info!(
                "Cluster {} still disputed after {} rounds; keeping '{}'",
                record.cluster,
                record.rounds_used(),
                record.current().label
            );
            self.client.logger().log(ConversationEvent::cluster_resolved(
                &record.cluster,
                record.current(),
                record.rounds_used(),
                false,
            ));
        }

        ResolveOutcome { records, failures }
    }
}
