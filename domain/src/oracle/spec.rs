//! Configured oracle value objects.

use super::kind::OracleKind;
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name under which an oracle's votes are recorded (defaults to its model id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleName(String);

impl OracleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OracleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OracleName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OracleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&OracleName> for OracleName {
    fn from(n: &OracleName) -> Self {
        n.clone()
    }
}

impl Borrow<str> for OracleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// API credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One configured oracle.
///
/// # Example
///
/// ```
/// use celltype_domain::{Credential, OracleKind, OracleSpec};
///
/// let oracle = OracleSpec::new(OracleKind::OpenAi, "gpt-4o", Credential::new("sk-test"));
/// assert_eq!(oracle.name.as_str(), "gpt-4o");
/// assert_eq!(oracle.kind, OracleKind::OpenAi);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSpec {
    pub name: OracleName,
    pub kind: OracleKind,
    pub model: String,
    pub credential: Credential,
}

impl OracleSpec {
    pub fn new(kind: OracleKind, model: impl Into<String>, credential: Credential) -> Self {
        let model = model.into();
        Self {
            name: OracleName::new(model.clone()),
            kind,
            model,
            credential,
        }
    }

    /// Oracle with the provider's default model.
    pub fn with_default_model(kind: OracleKind, credential: Credential) -> Self {
        Self::new(kind, kind.default_model(), credential)
    }

    pub fn with_name(mut self, name: impl Into<OracleName>) -> Self {
        self.name = name.into();
        self
    }
}

/// Parse an oracle target such as `"openai:gpt-4o"`, `"anthropic"` or a bare
/// model id like `"claude-3-opus"` into a provider and optional model.
///
/// # Example
///
/// ```
/// use celltype_domain::OracleKind;
/// use celltype_domain::oracle::spec::parse_oracle_target;
///
/// let (kind, model) = parse_oracle_target("openrouter:meta-llama/llama-3:free").unwrap();
/// assert_eq!(kind, OracleKind::OpenRouter);
/// assert_eq!(model.as_deref(), Some("meta-llama/llama-3:free"));
/// ```
pub fn parse_oracle_target(target: &str) -> Result<(OracleKind, Option<String>), ConfigError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ConfigError::UnknownProvider(String::new()));
    }

    if let Some((provider, model)) = target.split_once(':')
        && let Ok(kind) = provider.parse::<OracleKind>()
    {
        let model = model.trim();
        return Ok((kind, (!model.is_empty()).then(|| model.to_string())));
    }

    if let Ok(kind) = target.parse::<OracleKind>() {
        return Ok((kind, None));
    }

    OracleKind::infer_from_model(target)
        .map(|kind| (kind, Some(target.to_string())))
        .ok_or_else(|| ConfigError::UnknownProvider(target.to_string()))
}
