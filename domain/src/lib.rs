//! Domain layer for celltype-quorum
//!
//! Pure types and algorithms for annotating cell clusters with several
//! oracles (LLMs) and reconciling their answers. No I/O happens here.
//!
//! # Core Concepts
//!
//! ## Prediction Normalizer
//!
//! Free-text oracle output is read through a chain of total parsers and
//! cleaned into canonical labels ([`annotation`]). Anything unreadable
//! becomes the empty "unknown" label, which still counts as a vote.
//!
//! ## Consensus
//!
//! Labels are grouped lexically, the largest class wins (ties go to the
//! earliest oracle), and each cluster gets an agreement proportion and a
//! normalized entropy ([`consensus`]). Clusters falling short of either
//! threshold are controversial.
//!
//! ## Discussion
//!
//! Controversial clusters move `Pending → Discussing → Resolved` across a
//! bounded number of rounds ([`discussion`]). A record that runs out of
//! rounds is still `Resolved`; its final proportion and entropy show that it
//! never converged.

pub mod annotation;
pub mod config;
pub mod consensus;
pub mod core;
pub mod discussion;
pub mod oracle;
pub mod orchestration;
pub mod prompt;
pub mod report;

pub use annotation::{
    AnnotationContext, Cluster, ClusterId, MarkerSet, OraclePrediction, PredictionMatrix,
    UNRESOLVED_LABEL, clean_annotation, label_key, parse_annotation_response, parse_batch_response,
};
pub use config::{ConsensusMode, OutputFormat};
pub use consensus::{
    CheckedConsensus, ConsensusMethod, ConsensusResult, ConsensusTable, ConsensusThresholds,
    compute_consensus, compute_consensus_for, parse_consensus_check,
};
pub use core::error::ConfigError;
pub use discussion::{
    ControversyRecord, DiscussionReply, DiscussionRound, DiscussionState, OracleStatement,
    parse_discussion_response,
};
pub use oracle::{Credential, OracleKind, OracleName, OracleSpec, WireDialect};
pub use orchestration::Phase;
pub use prompt::PromptTemplate;
pub use report::{
    ClusterReport, Confusion, FinalReport, ModelComparison, OracleAgreement, OracleFailure,
    PairAgreement,
};
