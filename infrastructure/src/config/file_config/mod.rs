//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted once into the immutable
//! [`RunConfig`] the use cases consume.

mod annotation;
mod cache;
mod consensus;
mod http;
mod logging;
mod oracles;
mod output;
mod providers;

pub use annotation::FileAnnotationConfig;
pub use cache::FileCacheConfig;
pub use consensus::FileConsensusConfig;
pub use http::FileHttpConfig;
pub use logging::FileLoggingConfig;
pub use oracles::FileOracleConfig;
pub use output::FileOutputConfig;
pub use providers::FileProviderConfig;

use crate::providers::HttpSettings;
use celltype_application::RunConfig;
use celltype_domain::{
    ConfigError, ConsensusMode, ConsensusThresholds, Credential, OracleKind, OracleSpec,
    PromptTemplate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: no run can start from this configuration.
    Error,
    /// Non-fatal: the run works but may not behave as expected.
    Warning,
}

/// A detected issue in the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Species, tissue and free-text context
    pub annotation: FileAnnotationConfig,
    /// Thresholds, discussion budget and consensus mode
    pub consensus: FileConsensusConfig,
    /// Oracles in vote order
    pub oracles: Vec<FileOracleConfig>,
    /// Per-provider endpoint and credential overrides, keyed by provider id
    pub providers: BTreeMap<String, FileProviderConfig>,
    /// HTTP timeout and retry policy
    pub http: FileHttpConfig,
    /// Response cache
    pub cache: FileCacheConfig,
    /// Log file destinations
    pub logging: FileLoggingConfig,
    /// Report rendering
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Errors here would also make [`to_run_config`](Self::to_run_config)
    /// fail; reporting them together lets `--show-config` list every problem
    /// at once.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("consensus.threshold", self.consensus.threshold),
            ("consensus.entropy_threshold", self.consensus.entropy_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ConfigIssue::error(
                    field,
                    format!("{}: must be within [0, 1], got {}", field, value),
                ));
            }
        }

        for (i, oracle) in self.oracles.iter().enumerate() {
            if oracle.provider.parse::<OracleKind>().is_err() {
                issues.push(ConfigIssue::error(
                    format!("oracles[{}].provider", i),
                    format!("oracles[{}]: unknown provider '{}'", i, oracle.provider),
                ));
            }
        }

        for provider in self.providers.keys() {
            if provider.parse::<OracleKind>().is_err() {
                issues.push(ConfigIssue::error(
                    format!("providers.{}", provider),
                    format!("[providers.{}]: unknown provider", provider),
                ));
            }
        }

        let template = self.annotation.to_context().prompt_template;
        if let Some(template) = template
            && PromptTemplate::validate_custom(&template).is_err()
        {
            issues.push(ConfigIssue::error(
                "annotation.prompt_template",
                "annotation.prompt_template: missing the {markers} placeholder",
            ));
        }

        if self.oracles.is_empty() {
            issues.push(ConfigIssue::warning(
                "oracles",
                "no [[oracles]] configured; pass them with --oracle",
            ));
        }

        if let Some(checker) = &self.consensus.checker {
            if self.consensus.mode == ConsensusMode::Lexical {
                issues.push(ConfigIssue::warning(
                    "consensus.checker",
                    "consensus.checker is ignored in lexical mode",
                ));
            }
            let names: Vec<String> = self.oracles.iter().filter_map(oracle_name).collect();
            if !self.oracles.is_empty() && !names.contains(checker) {
                issues.push(ConfigIssue::error(
                    "consensus.checker",
                    format!("consensus.checker: '{}' is not a configured oracle", checker),
                ));
            }
        }

        issues
    }

    /// Convert into the immutable run configuration, reading credentials
    /// from the process environment.
    pub fn to_run_config(&self) -> Result<RunConfig, ConfigError> {
        self.to_run_config_with(|var| std::env::var(var).ok())
    }

    /// Like [`to_run_config`](Self::to_run_config) with an explicit
    /// environment lookup.
    pub fn to_run_config_with<F>(&self, env: F) -> Result<RunConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let thresholds =
            ConsensusThresholds::new(self.consensus.threshold, self.consensus.entropy_threshold)?;

        let oracles = self
            .oracles
            .iter()
            .map(|oracle| self.oracle_spec(oracle, &env))
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = RunConfig::new(oracles, self.annotation.to_context())
            .with_thresholds(thresholds)
            .with_max_discussion_rounds(self.consensus.max_discussion_rounds)
            .with_mode(self.consensus.mode);
        if let Some(checker) = &self.consensus.checker {
            config = config.with_checker(checker.as_str());
        }
        if !self.cache.enabled {
            config = config.without_cache();
        }

        config.validate()?;
        Ok(config)
    }

    fn oracle_spec<F>(&self, oracle: &FileOracleConfig, env: &F) -> Result<OracleSpec, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind: OracleKind = oracle.provider.parse()?;
        let model = oracle
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(kind.default_model());
        let name = oracle_name(oracle).unwrap_or_else(|| model.to_string());

        let overrides = self.providers.get(kind.as_str());
        let credential = resolve_credential(oracle, overrides, kind, env).ok_or_else(|| {
            ConfigError::MissingCredential {
                oracle: name.clone(),
                env: oracle
                    .api_key_env
                    .clone()
                    .or_else(|| overrides.and_then(|p| p.api_key_env.clone()))
                    .unwrap_or_else(|| kind.api_key_env().to_string()),
            }
        })?;

        Ok(OracleSpec::new(kind, model, credential).with_name(name))
    }

    /// Base URL overrides from `[providers.<provider>]`.
    pub fn base_url_overrides(&self) -> HashMap<OracleKind, String> {
        self.providers
            .iter()
            .filter_map(|(provider, config)| {
                let kind = provider.parse::<OracleKind>().ok()?;
                let url = config.base_url.as_deref().map(str::trim)?;
                (!url.is_empty()).then(|| (kind, url.trim_end_matches('/').to_string()))
            })
            .collect()
    }

    /// Timeout and retry policy for the HTTP gateway.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_secs),
            max_retries: self.http.max_retries,
            retry_base_delay: Duration::from_millis(self.http.retry_base_delay_ms),
        }
    }
}

/// Name an oracle's votes are recorded under: explicit name, then model,
/// then the provider's default model.
fn oracle_name(oracle: &FileOracleConfig) -> Option<String> {
    let explicit = [oracle.name.as_deref(), oracle.model.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|n| !n.is_empty());
    match explicit {
        Some(name) => Some(name.to_string()),
        None => oracle
            .provider
            .parse::<OracleKind>()
            .ok()
            .map(|kind| kind.default_model().to_string()),
    }
}

/// Explicit key, then the oracle's env var, then the provider override, then
/// the provider's conventional env var.
fn resolve_credential<F>(
    oracle: &FileOracleConfig,
    overrides: Option<&FileProviderConfig>,
    kind: OracleKind,
    env: &F,
) -> Option<Credential>
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = |var: &Option<String>| var.as_deref().and_then(|v| env(v.trim()));

    [
        oracle.api_key.clone(),
        from_env(&oracle.api_key_env),
        overrides.and_then(|p| p.api_key.clone()),
        overrides.and_then(|p| from_env(&p.api_key_env)),
        env(kind.api_key_env()),
    ]
    .into_iter()
    .flatten()
    .map(Credential::new)
    .find(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.to_string())
        }
    }

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_default_config_is_valid_apart_from_oracles() {
        let issues = FileConfig::default().validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].field, "oracles");
    }

    #[test]
    fn test_validate_reports_every_error() {
        let config = parse(
            r#"
[consensus]
threshold = 1.5
entropy_threshold = -0.1

[[oracles]]
provider = "mystery"

[providers.nowhere]
base_url = "http://localhost"
"#,
        );
        let errors: Vec<_> = config
            .validate()
            .into_iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.field)
            .collect();
        assert_eq!(
            errors,
            vec![
                "consensus.threshold",
                "consensus.entropy_threshold",
                "oracles[0].provider",
                "providers.nowhere",
            ]
        );
    }

    #[test]
    fn test_validate_unknown_checker() {
        let config = parse(
            r#"
[consensus]
mode = "oracle"
checker = "judge"

[[oracles]]
provider = "openai"
"#,
        );
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "consensus.checker"
            && i.severity == Severity::Error));
    }

    #[test]
    fn test_validate_prompt_template_placeholder() {
        let config = parse(
            r#"
[annotation]
prompt_template = "Name each {species} cluster"
"#,
        );
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "annotation.prompt_template"
            && i.severity == Severity::Error));
    }

    #[test]
    fn test_to_run_config_resolves_defaults_and_credentials() {
        let config = parse(
            r#"
[annotation]
species = "mouse"

[consensus]
threshold = 0.5
max_discussion_rounds = 2

[[oracles]]
provider = "openai"

[[oracles]]
provider = "anthropic"
model = "claude-3-opus"
name = "opus"
api_key = "sk-ant-inline"
"#,
        );
        let run = config
            .to_run_config_with(env_of(&[("OPENAI_API_KEY", "sk-openai")]))
            .unwrap();

        assert_eq!(run.oracles.len(), 2);
        assert_eq!(run.oracles[0].model, "gpt-4.1");
        assert_eq!(run.oracles[0].name.as_str(), "gpt-4.1");
        assert_eq!(run.oracles[0].credential.expose(), "sk-openai");
        assert_eq!(run.oracles[1].name.as_str(), "opus");
        assert_eq!(run.oracles[1].credential.expose(), "sk-ant-inline");
        assert_eq!(run.thresholds.consensus_threshold(), 0.5);
        assert_eq!(run.max_discussion_rounds, 2);
        assert_eq!(run.context.species, "mouse");
        assert!(run.use_cache);
    }

    #[test]
    fn test_credential_priority() {
        let config = parse(
            r#"
[[oracles]]
provider = "deepseek"
api_key_env = "ORACLE_KEY"

[providers.deepseek]
api_key_env = "PROVIDER_KEY"
"#,
        );

        let run = config
            .to_run_config_with(env_of(&[
                ("ORACLE_KEY", "from-oracle"),
                ("PROVIDER_KEY", "from-provider"),
                ("DEEPSEEK_API_KEY", "from-default"),
            ]))
            .unwrap();
        assert_eq!(run.oracles[0].credential.expose(), "from-oracle");

        let run = config
            .to_run_config_with(env_of(&[
                ("PROVIDER_KEY", "from-provider"),
                ("DEEPSEEK_API_KEY", "from-default"),
            ]))
            .unwrap();
        assert_eq!(run.oracles[0].credential.expose(), "from-provider");

        let run = config
            .to_run_config_with(env_of(&[("DEEPSEEK_API_KEY", "from-default")]))
            .unwrap();
        assert_eq!(run.oracles[0].credential.expose(), "from-default");
    }

    #[test]
    fn test_missing_credential_names_env_var() {
        let config = parse(
            r#"
[[oracles]]
provider = "gemini"
"#,
        );
        let err = config.to_run_config_with(env_of(&[])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingCredential {
                oracle: "gemini-2.5-pro-preview-03-25".to_string(),
                env: "GEMINI_API_KEY".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let config = parse(
            r#"
[[oracles]]
provider = "grok"
api_key = "   "
"#,
        );
        assert!(matches!(
            config.to_run_config_with(env_of(&[])),
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_to_run_config_rejects_bad_threshold() {
        let config = parse(
            r#"
[consensus]
entropy_threshold = 2.0

[[oracles]]
provider = "openai"
api_key = "k"
"#,
        );
        assert!(matches!(
            config.to_run_config_with(env_of(&[])),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_to_run_config_rejects_unknown_provider() {
        let config = parse(
            r#"
[[oracles]]
provider = "mystery"
api_key = "k"
"#,
        );
        assert!(matches!(
            config.to_run_config_with(env_of(&[])),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_disabled_cache_and_checker_carry_over() {
        let config = parse(
            r#"
[consensus]
mode = "oracle"
checker = "judge"

[cache]
enabled = false

[[oracles]]
provider = "openai"
name = "judge"
api_key = "k"
"#,
        );
        let run = config.to_run_config_with(env_of(&[])).unwrap();
        assert!(!run.use_cache);
        assert_eq!(run.mode, ConsensusMode::Oracle);
        assert_eq!(run.checker_spec().unwrap().name.as_str(), "judge");
    }

    #[test]
    fn test_base_url_overrides() {
        let config = parse(
            r#"
[providers.openai]
base_url = "http://localhost:8080/v1/"

[providers.anthropic]
api_key_env = "X"
"#,
        );
        let overrides = config.base_url_overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[&OracleKind::OpenAi], "http://localhost:8080/v1");
    }

    #[test]
    fn test_http_settings() {
        let settings = parse(
            r#"
[http]
timeout_secs = 5
max_retries = 1
"#,
        )
        .http_settings();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.max_retries, 1);
        assert_eq!(settings.retry_base_delay, Duration::from_millis(2000));
    }
}
