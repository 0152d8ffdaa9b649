//! Domain error types

use thiserror::Error;

/// Configuration errors. Always fatal: a run is never attempted with an
/// invalid configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Unknown oracle provider: '{0}'")]
    UnknownProvider(String),

    #[error("Unknown oracle: '{0}'")]
    UnknownOracle(String),

    #[error("No oracles configured")]
    NoOracles,

    #[error("Oracle '{0}' is configured more than once")]
    DuplicateOracle(String),

    #[error("No credential for oracle '{oracle}' (set {env} or api_key)")]
    MissingCredential { oracle: String, env: String },

    #[error("Marker set is empty")]
    EmptyMarkerSet,

    #[error("Prompt template must contain the {{markers}} placeholder")]
    PromptTemplateWithoutMarkers,
}

impl ConfigError {
    /// Validate a threshold that must lie in `[0, 1]`.
    pub fn check_unit_interval(name: &'static str, value: f64) -> Result<f64, ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::InvalidThreshold { name, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_unit_interval() {
        assert_eq!(ConfigError::check_unit_interval("t", 0.0), Ok(0.0));
        assert_eq!(ConfigError::check_unit_interval("t", 1.0), Ok(1.0));
        assert!(ConfigError::check_unit_interval("t", 1.01).is_err());
        assert!(ConfigError::check_unit_interval("t", -0.1).is_err());
        assert!(ConfigError::check_unit_interval("t", f64::NAN).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidThreshold {
            name: "consensus_threshold",
            value: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "consensus_threshold must be within [0, 1], got 1.5"
        );
        assert_eq!(ConfigError::NoOracles.to_string(), "No oracles configured");
    }
}
