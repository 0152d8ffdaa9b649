//! Oracle providers over HTTP.
//!
//! [`HttpOracleGateway`] implements the `OracleGateway` port. Each
//! [`OracleKind`](celltype_domain::OracleKind) gets a [`ProviderAdapter`]
//! at construction time; the wire format is chosen from the provider's
//! dialect (OpenAI-compatible chat, Anthropic Messages or Gemini
//! generateContent).

pub mod adapter;
pub mod dialect;
pub mod gateway;

pub use adapter::ProviderAdapter;
pub use gateway::HttpOracleGateway;

use std::time::Duration;

/// Timeout and retry policy shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Retries after the first attempt, for retryable errors only
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(2000),
        }
    }
}
