//! Port for structured conversation logging.
//!
//! [`ConversationLogger`] records what every oracle said and how consensus
//! moved, as machine-readable events (JSONL in the infrastructure adapter).
//! Human-readable diagnostics go through `tracing` instead.

use celltype_domain::{ClusterId, ConsensusResult, OracleName, Phase};
use serde_json::{Value, json};

/// A structured conversation event for logging.
///
/// The adapter adds the `type` and `timestamp` fields when writing.
pub struct ConversationEvent {
    /// Event type identifier (e.g. "oracle_response", "discussion_round").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn oracle_response(
        oracle: &OracleName,
        phase: &Phase,
        prompt: &str,
        lines: &[String],
        cached: bool,
    ) -> Self {
        Self::new(
            "oracle_response",
            json!({
                "oracle": oracle,
                "phase": phase,
                "prompt": prompt,
                "response": lines,
                "cached": cached,
            }),
        )
    }

    pub fn oracle_failure(oracle: &OracleName, phase: &Phase, error: &str) -> Self {
        Self::new(
            "oracle_failure",
            json!({
                "oracle": oracle,
                "phase": phase,
                "error": error,
            }),
        )
    }

    pub fn consensus_computed(
        cluster: &ClusterId,
        phase: &Phase,
        result: &ConsensusResult,
        controversial: bool,
    ) -> Self {
        Self::new(
            "consensus_computed",
            json!({
                "cluster": cluster,
                "phase": phase,
                "label": result.label,
                "proportion": result.proportion,
                "entropy": result.entropy,
                "voters": result.voters,
                "method": result.method,
                "controversial": controversial,
            }),
        )
    }

    pub fn discussion_round(
        round: usize,
        clusters: &[ClusterId],
        responded: usize,
        skipped: bool,
    ) -> Self {
        Self::new(
            "discussion_round",
            json!({
                "round": round,
                "clusters": clusters,
                "responded": responded,
                "skipped": skipped,
            }),
        )
    }

    pub fn cluster_resolved(
        cluster: &ClusterId,
        result: &ConsensusResult,
        rounds_used: usize,
        converged: bool,
    ) -> Self {
        Self::new(
            "cluster_resolved",
            json!({
                "cluster": cluster,
                "label": result.label,
                "proportion": result.proportion,
                "entropy": result.entropy,
                "rounds_used": rounds_used,
                "converged": converged,
            }),
        )
    }
}

/// Port for logging conversation events to a structured log.
///
/// `log` is synchronous and infallible; write failures are the adapter's
/// problem and never reach the run.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
