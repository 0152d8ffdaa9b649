//! Oracles: the text-generating models that vote on cluster labels.
//!
//! - [`OracleKind`]: closed set of supported providers, resolved once at
//!   configuration time
//! - [`OracleSpec`]: one configured oracle (name, provider, model, credential)
//! - [`OracleName`]: the key an oracle's votes are recorded under

pub mod kind;
pub mod spec;

pub use kind::{OracleKind, WireDialect};
pub use spec::{Credential, OracleName, OracleSpec};
