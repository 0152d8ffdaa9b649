//! Application layer for celltype-quorum
//!
//! This crate contains use cases, port definitions, and the run
//! configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::RunConfig;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    oracle_gateway::{OracleError, OracleGateway},
    progress::{NoProgress, ProgressNotifier},
    response_cache::{Fingerprint, NoCache, ResponseCache},
};
pub use use_cases::annotate_clusters::{AnnotateClustersUseCase, AnnotationOutcome};
pub use use_cases::check_consensus::{CheckConsensusUseCase, ConsensusOutcome, ConsensusPolicy};
pub use use_cases::resolve_controversies::{
    ResolveControversiesUseCase, ResolveInput, ResolveOutcome,
};
pub use use_cases::run_annotation::{RunAnnotationError, RunAnnotationUseCase};
pub use use_cases::shared::{FanOutResult, OracleClient, fan_out};
