//! HTTP implementation of the [`OracleGateway`] port.

use super::HttpSettings;
use super::adapter::ProviderAdapter;
use super::dialect;
use async_trait::async_trait;
use celltype_application::{OracleError, OracleGateway};
use celltype_domain::{OracleKind, OracleSpec};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Calls every supported provider over HTTPS with bounded retries.
pub struct HttpOracleGateway {
    client: Client,
    settings: HttpSettings,
    /// Indexed by [`OracleKind::index`]
    adapters: [ProviderAdapter; OracleKind::ALL.len()],
}

impl HttpOracleGateway {
    /// Build adapters for every provider, applying base URL overrides.
    pub fn new(
        settings: HttpSettings,
        base_urls: &HashMap<OracleKind, String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("celltype-quorum/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let adapters = OracleKind::ALL
            .map(|kind| ProviderAdapter::new(kind, base_urls.get(&kind).map(String::as_str)));

        Ok(Self {
            client,
            settings,
            adapters,
        })
    }

    pub fn adapter(&self, kind: OracleKind) -> &ProviderAdapter {
        &self.adapters[kind.index()]
    }

    async fn attempt(
        &self,
        adapter: &ProviderAdapter,
        oracle: &OracleSpec,
        prompt: &str,
    ) -> Result<Vec<String>, OracleError> {
        let response = adapter
            .request(&self.client, oracle, prompt)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        adapter.decode(&body)
    }
}

#[async_trait]
impl OracleGateway for HttpOracleGateway {
    async fn call(&self, oracle: &OracleSpec, prompt: &str) -> Result<Vec<String>, OracleError> {
        let adapter = self.adapter(oracle.kind);

        if oracle.kind == OracleKind::OpenRouter && !oracle.model.contains('/') {
            warn!(
                model = %oracle.model,
                "OpenRouter model ids are usually 'provider/model'"
            );
        }

        let mut attempt = 0;
        loop {
            match self.attempt(adapter, oracle, prompt).await {
                Ok(lines) => {
                    debug!(oracle = %oracle.name, lines = lines.len(), "Oracle responded");
                    return Ok(lines);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = self.settings.backoff(attempt);
                    warn!(
                        oracle = %oracle.name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map a non-success HTTP status to an oracle error.
pub fn classify_status(status: StatusCode, body: &str) -> OracleError {
    let message = format!("HTTP {}: {}", status.as_u16(), dialect::error_message(body));
    match status.as_u16() {
        401 | 403 => OracleError::Auth(message),
        404 => OracleError::InvalidModel(message),
        429 => OracleError::RateLimited(message),
        408 | 500..=599 => OracleError::Transient(message),
        _ => OracleError::MalformedResponse(message),
    }
}

fn transport_error(e: reqwest::Error) -> OracleError {
    if e.is_decode() {
        OracleError::MalformedResponse(e.to_string())
    } else {
        OracleError::Transient(e.to_string())
    }
}

impl HttpSettings {
    /// Delay before retry number `attempt + 1`: `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}
