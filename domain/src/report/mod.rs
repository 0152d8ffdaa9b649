//! Final report of an annotation run.

mod comparison;
mod final_report;

pub use comparison::{Confusion, ModelComparison, OracleAgreement, PairAgreement};
pub use final_report::{ClusterReport, FinalReport, OracleFailure};
