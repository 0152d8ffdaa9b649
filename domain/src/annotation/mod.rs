//! Clusters, per-oracle predictions and the text normalization that turns
//! oracle output into comparable labels.

pub mod batch;
pub mod cluster;
pub mod context;
pub mod normalize;
pub mod parsing;
pub mod prediction;

pub use batch::parse_batch_response;
pub use cluster::{Cluster, ClusterId, MarkerSet};
pub use context::AnnotationContext;
pub use normalize::{UNRESOLVED_LABEL, clean_annotation, label_key};
pub use parsing::{extract_json, parse_annotation_response};
pub use prediction::{OraclePrediction, PredictionMatrix};
