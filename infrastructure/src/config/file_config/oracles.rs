//! Oracle list from TOML (`[[oracles]]` tables)

use celltype_domain::ConfigError;
use celltype_domain::oracle::spec::parse_oracle_target;
use serde::{Deserialize, Serialize};

/// One configured oracle.
///
/// ```toml
/// [[oracles]]
/// provider = "anthropic"
/// model = "claude-3-7-sonnet-20250219"
/// api_key_env = "MY_ANTHROPIC_KEY"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    /// Provider identifier, e.g. "openai" or "openrouter"
    pub provider: String,
    /// Model id (default: the provider's default model)
    pub model: Option<String>,
    /// Name votes are recorded under (default: the model id)
    pub name: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

impl FileOracleConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build from a command-line target such as `"openai:gpt-4o"`,
    /// `"deepseek"` or a bare model id.
    pub fn from_target(target: &str) -> Result<Self, ConfigError> {
        let (kind, model) = parse_oracle_target(target)?;
        Ok(Self {
            provider: kind.as_str().to_string(),
            model,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;
    use super::*;

    #[test]
    fn test_oracle_tables() {
        let toml_str = r#"
[[oracles]]
provider = "openai"
model = "gpt-4o"

[[oracles]]
provider = "deepseek"
name = "ds"
api_key_env = "MY_DS_KEY"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.oracles.len(), 2);
        assert_eq!(config.oracles[0].model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.oracles[1].name.as_deref(), Some("ds"));
        assert_eq!(config.oracles[1].model, None);
        assert_eq!(config.oracles[1].api_key_env.as_deref(), Some("MY_DS_KEY"));
    }

    #[test]
    fn test_from_target() {
        let oracle = FileOracleConfig::from_target("openrouter:anthropic/claude-3.5-sonnet").unwrap();
        assert_eq!(oracle.provider, "openrouter");
        assert_eq!(oracle.model.as_deref(), Some("anthropic/claude-3.5-sonnet"));

        let oracle = FileOracleConfig::from_target("claude-3-opus").unwrap();
        assert_eq!(oracle.provider, "anthropic");

        assert!(FileOracleConfig::from_target("llama-3").is_err());
    }
}
