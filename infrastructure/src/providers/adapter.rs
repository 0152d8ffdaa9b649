//! One adapter per provider, resolved when the gateway is built.

use super::dialect;
use celltype_application::OracleError;
use celltype_domain::{OracleKind, OracleSpec, WireDialect};
use reqwest::{Client, RequestBuilder};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const APP_TITLE: &str = "celltype-quorum";

/// Endpoint and auth scheme for one provider.
#[derive(Debug, Clone)]
pub struct ProviderAdapter {
    kind: OracleKind,
    dialect: WireDialect,
    base_url: String,
}

impl ProviderAdapter {
    pub fn new(kind: OracleKind, base_url: Option<&str>) -> Self {
        let base_url = base_url
            .unwrap_or(kind.default_base_url())
            .trim_end_matches('/')
            .to_string();
        Self {
            kind,
            dialect: kind.dialect(),
            base_url,
        }
    }

    pub fn kind(&self) -> OracleKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, model: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            dialect::endpoint_path(self.dialect, model)
        )
    }

    /// Build the HTTP request for one prompt.
    pub fn request(&self, client: &Client, oracle: &OracleSpec, prompt: &str) -> RequestBuilder {
        let key = oracle.credential.expose();
        let request = client
            .post(self.url(&oracle.model))
            .json(&dialect::request_body(self.dialect, &oracle.model, prompt));

        match self.dialect {
            WireDialect::OpenAiChat => {
                let request = request.bearer_auth(key);
                if self.kind == OracleKind::OpenRouter {
                    request
                        .header("HTTP-Referer", "https://github.com/celltype-quorum")
                        .header("X-Title", APP_TITLE)
                } else {
                    request
                }
            }
            WireDialect::AnthropicMessages => request
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            WireDialect::GeminiGenerate => request.query(&[("key", key)]),
        }
    }

    /// Decode a successful body into response lines.
    pub fn decode(&self, body: &str) -> Result<Vec<String>, OracleError> {
        dialect::extract_text(self.dialect, body).map(|text| dialect::split_lines(&text))
    }
}
