//! Provider overrides from TOML (`[providers.<provider>]` tables)

use serde::{Deserialize, Serialize};

/// Per-provider overrides applied to every oracle of that provider.
///
/// ```toml
/// [providers.openai]
/// base_url = "https://my-proxy.example.com/v1"
/// api_key_env = "PROXY_KEY"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// API endpoint replacing the provider's default
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;

    #[test]
    fn test_provider_tables() {
        let toml_str = r#"
[providers.openai]
base_url = "http://localhost:8080/v1"

[providers.gemini]
api_key_env = "GOOGLE_KEY"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.providers["openai"].base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(
            config.providers["gemini"].api_key_env.as_deref(),
            Some("GOOGLE_KEY")
        );
    }
}
