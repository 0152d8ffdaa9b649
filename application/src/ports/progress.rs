//! Progress notification port
//!
//! Defines the interface for reporting progress during an annotation run.

use celltype_domain::{ClusterId, ConsensusResult, OracleName, Phase};

/// Callback for progress updates during an annotation run
///
/// Implementations live in the presentation layer.
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: &Phase, total_tasks: usize);

    /// Called when one oracle call within a phase completes
    fn on_task_complete(&self, phase: &Phase, oracle: &OracleName, success: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: &Phase);

    /// Called when a controversial cluster reaches agreement during discussion.
    fn on_cluster_resolved(
        &self,
        _cluster: &ClusterId,
        _consensus: &ConsensusResult,
        _round: usize,
    ) {
    }
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: &Phase, _total_tasks: usize) {}
    fn on_task_complete(&self, _phase: &Phase, _oracle: &OracleName, _success: bool) {}
    fn on_phase_complete(&self, _phase: &Phase) {}
}
