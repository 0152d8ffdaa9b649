//! Use cases for the application layer

pub mod annotate_clusters;
pub mod check_consensus;
pub mod resolve_controversies;
pub mod run_annotation;
pub mod shared;
