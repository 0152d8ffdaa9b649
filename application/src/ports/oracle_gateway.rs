//! Oracle Gateway port
//!
//! Defines the interface for sending a prompt to one configured oracle.

use async_trait::async_trait;
use celltype_domain::OracleSpec;
use thiserror::Error;

/// Errors from a single oracle call, after the adapter's own retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient network error: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

impl OracleError {
    /// `RateLimited` and `Transient` may succeed on retry; everything else is
    /// fatal for that oracle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::RateLimited(_) | OracleError::Transient(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Auth(_) => "auth",
            OracleError::RateLimited(_) => "rate_limited",
            OracleError::Transient(_) => "transient",
            OracleError::MalformedResponse(_) => "malformed_response",
            OracleError::InvalidModel(_) => "invalid_model",
        }
    }
}

/// Gateway to the oracles.
///
/// Returns the response split into lines, nominally one per queried
/// cluster. Implementations (adapters) live in the infrastructure layer and
/// own retries and timeouts.
#[async_trait]
pub trait OracleGateway: Send + Sync {
    async fn call(&self, oracle: &OracleSpec, prompt: &str) -> Result<Vec<String>, OracleError>;
}
