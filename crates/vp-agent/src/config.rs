//! Agent configuration, loadable from TOML with an environment overlay.

use serde::{Deserialize, Serialize};
use vp_flight::FlightConfig;
use vp_interpreter::{ConfigError, ConfigResult, InterpreterConfig};

/// Top-level configuration for the `voicepilot` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub flight: FlightConfig,
}

/// What the session does with a command flagged low-confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowConfidencePolicy {
    /// Send it anyway, with a warning.
    #[default]
    Dispatch,
    /// Hold it until the next transcript affirms it.
    Confirm,
    /// Drop it.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub low_confidence_policy: LowConfidencePolicy,
    /// Consecutive remote failures before a single degraded-mode notice.
    /// Zero disables the notice.
    #[serde(default = "default_degraded_notice_after")]
    pub degraded_notice_after: u32,
}

fn default_degraded_notice_after() -> u32 {
    3
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            low_confidence_policy: LowConfidencePolicy::default(),
            degraded_notice_after: default_degraded_notice_after(),
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env(&mut self) {
        self.interpreter.apply_env();
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.interpreter.apply_env_with(lookup);
    }

    /// Command-line flags win over both the file and the environment.
    pub fn apply_overrides(&mut self, api_key: Option<&str>, fallback_only: bool) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.interpreter.remote.api_key = Some(key.to_string());
        }
        if fallback_only {
            self.interpreter.fallback_only = true;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.interpreter.validate()?;
        self.flight
            .validate()
            .map_err(|e| ConfigError::InvalidConfiguration(format!("flight: {e}")))
    }
}
