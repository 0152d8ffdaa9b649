//! Immutable run configuration.
//!
//! Built once at start-up (from files, environment and CLI flags) and passed
//! explicitly to the use cases.

use celltype_domain::{
    AnnotationContext, ConfigError, ConsensusMode, ConsensusThresholds, OracleName, OracleSpec,
    PromptTemplate,
};
use std::collections::HashSet;

pub const DEFAULT_MAX_DISCUSSION_ROUNDS: usize = 3;

/// Everything the orchestrator needs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Oracles in vote order; ties go to the earlier oracle
    pub oracles: Vec<OracleSpec>,
    pub thresholds: ConsensusThresholds,
    pub max_discussion_rounds: usize,
    pub mode: ConsensusMode,
    /// Oracle that judges agreement in [`ConsensusMode::Oracle`]; defaults
    /// to the first oracle
    pub checker: Option<OracleName>,
    pub context: AnnotationContext,
    pub use_cache: bool,
}

impl RunConfig {
    pub fn new(oracles: Vec<OracleSpec>, context: AnnotationContext) -> Self {
        Self {
            oracles,
            thresholds: ConsensusThresholds::default(),
            max_discussion_rounds: DEFAULT_MAX_DISCUSSION_ROUNDS,
            mode: ConsensusMode::default(),
            checker: None,
            context,
            use_cache: true,
        }
    }

    pub fn with_thresholds(mut self, thresholds: ConsensusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_max_discussion_rounds(mut self, rounds: usize) -> Self {
        self.max_discussion_rounds = rounds;
        self
    }

    pub fn with_mode(mut self, mode: ConsensusMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_checker(mut self, checker: impl Into<OracleName>) -> Self {
        self.checker = Some(checker.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// The oracle used for consensus checks.
    pub fn checker_spec(&self) -> Option<&OracleSpec> {
        match &self.checker {
            Some(name) => self.oracles.iter().find(|o| &o.name == name),
            None => self.oracles.first(),
        }
    }

    /// Reject configurations no run can start from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracles.is_empty() {
            return Err(ConfigError::NoOracles);
        }

        let mut seen = HashSet::new();
        for oracle in &self.oracles {
            if !seen.insert(oracle.name.as_str()) {
                return Err(ConfigError::DuplicateOracle(oracle.name.to_string()));
            }
            if oracle.credential.is_empty() {
                return Err(ConfigError::MissingCredential {
                    oracle: oracle.name.to_string(),
                    env: oracle.kind.api_key_env().to_string(),
                });
            }
        }

        if let Some(checker) = &self.checker
            && !self.oracles.iter().any(|o| &o.name == checker)
        {
            return Err(ConfigError::UnknownOracle(checker.to_string()));
        }

        if let Some(template) = &self.context.prompt_template {
            PromptTemplate::validate_custom(template)?;
        }
        Ok(())
    }
}
