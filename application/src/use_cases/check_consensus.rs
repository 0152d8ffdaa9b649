//! Check Consensus use case
//!
//! Computes per-cluster consensus for one round's matrix and flags
//! controversial clusters. In [`ConsensusMode::Oracle`] a checker oracle
//! judges each non-unanimous cluster; answers that fail validation fall back
//! to lexical voting.

use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::oracle_gateway::OracleGateway;
use crate::use_cases::shared::OracleClient;
use celltype_domain::{
    ClusterId, ConsensusMode, ConsensusResult, ConsensusTable, ConsensusThresholds,
    OracleFailure, OracleSpec, Phase, PredictionMatrix, PromptTemplate, compute_consensus_for,
    parse_consensus_check,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// How consensus should be judged for a round.
#[derive(Debug, Clone)]
pub struct ConsensusPolicy {
    pub thresholds: ConsensusThresholds,
    pub mode: ConsensusMode,
    /// Required for [`ConsensusMode::Oracle`]; lexical voting is used without one
    pub checker: Option<OracleSpec>,
}

impl ConsensusPolicy {
    pub fn lexical(thresholds: ConsensusThresholds) -> Self {
        Self {
            thresholds,
            mode: ConsensusMode::Lexical,
            checker: None,
        }
    }

    pub fn with_checker(mut self, checker: OracleSpec) -> Self {
        self.mode = ConsensusMode::Oracle;
        self.checker = Some(checker);
        self
    }
}

/// Consensus for one round.
#[derive(Debug, Clone, Default)]
pub struct ConsensusOutcome {
    pub table: ConsensusTable,
    /// Controversial clusters in table order
    pub controversial: Vec<ClusterId>,
    pub failures: Vec<OracleFailure>,
}

/// Use case for computing a round's consensus
pub struct CheckConsensusUseCase<G: OracleGateway + 'static> {
    client: OracleClient<G>,
}

impl<G: OracleGateway + 'static> CheckConsensusUseCase<G> {
    pub fn new(client: OracleClient<G>) -> Self {
        Self { client }
    }

    /// Consensus over `clusters`, all taken from the same `matrix`.
    pub async fn execute(
        &self,
        matrix: &PredictionMatrix,
        clusters: &[ClusterId],
        policy: &ConsensusPolicy,
        phase: Phase,
    ) -> ConsensusOutcome {
        let mut table = compute_consensus_for(matrix, clusters);
        let mut failures = Vec::new();

        if policy.mode == ConsensusMode::Oracle {
            match &policy.checker {
                Some(checker) => {
                    failures = self.apply_checker(matrix, &mut table, checker).await;
                }
                None => warn!("Oracle consensus requested without a checker; using lexical voting"),
            }
        }

        let controversial = policy.thresholds.controversial_clusters(&table);
        for (id, result) in table.iter() {
            let is_controversial = controversial.contains(id);
            self.client.logger().log(ConversationEvent::consensus_computed(
                id,
                &phase,
                result,
                is_controversial,
            ));
        }

        ConsensusOutcome {
            table,
            controversial,
            failures,
        }
    }

    /// Replace lexical results with validated checker judgements.
    ///
    /// Unanimous and voteless clusters are never sent to the checker.
    async fn apply_checker(
        &self,
        matrix: &PredictionMatrix,
        table: &mut ConsensusTable,
        checker: &OracleSpec,
    ) -> Vec<OracleFailure> {
        let phase = Phase::ConsensusCheck;
        let checker = Arc::new(checker.clone());
        let mut join_set = JoinSet::new();

        for (id, lexical) in table.iter() {
            if lexical.is_unanimous() || lexical.is_unresolved() {
                continue;
            }
            let votes: Vec<_> = matrix.votes_for(id.as_str()).collect();
            let prompt = PromptTemplate::consensus_check(id, &votes);
            let client = self.client.clone();
            let checker = Arc::clone(&checker);
            let id = id.clone();
            let voters = lexical.voters;
            join_set.spawn(async move {
                let response = client.call(&checker, phase, &prompt).await;
                (id, voters, response)
            });
        }

        let mut failures = Vec::new();
        let mut checked: Vec<(ClusterId, ConsensusResult)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let (id, voters, response) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!("Task join error: {}", e);
                    continue;
                }
            };
            match response {
                Ok(lines) => match parse_consensus_check(&lines) {
                    Some(judgement) => {
                        debug!("Checker judged cluster {}: {}", id, judgement.label);
                        checked.push((id, judgement.into_result(voters)));
                    }
                    None => warn!(
                        "Checker answer for cluster {} failed validation; using lexical voting",
                        id
                    ),
                },
                Err(e) => {
                    warn!("Checker {} failed for cluster {}: {}", checker.name, id, e);
                    failures.push(OracleFailure::new(
                        checker.name.clone(),
                        phase.to_string(),
                        e.to_string(),
                    ));
                }
            }
        }

        for (id, result) in checked {
            table.insert(id, result);
        }
        failures
    }
}
