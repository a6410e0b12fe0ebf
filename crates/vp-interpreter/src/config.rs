//! Interpreter configuration, loadable from TOML with an environment overlay.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vp_protocol::SafetyLimits;

use crate::error::{ConfigError, ConfigResult};
use crate::fallback::{FallbackParser, PatternGroup, default_groups};

/// Environment variable holding the remote interpreter credential.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding the remote model name.
pub const ENV_MODEL: &str = "VOICEPILOT_MODEL";
/// Environment variable forcing fallback-only mode ("true" or "1").
pub const ENV_FALLBACK_ONLY: &str = "VOICEPILOT_FALLBACK_ONLY";

/// Everything the arbiter needs, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Remote results below this are kept but flagged low-confidence.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Skip the remote interpreter entirely.
    #[serde(default)]
    pub fallback_only: bool,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub limits: SafetyLimits,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

fn default_confidence_threshold() -> f64 {
    0.4
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            fallback_only: false,
            remote: RemoteConfig::default(),
            limits: SafetyLimits::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

/// Settings for the Gemini `generateContent` endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// API base URL, without the `/models/...` suffix.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Never serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Per-call bound, enforced by the HTTP client and by the arbiter.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Reasoning budget; 0 disables model "thinking" to keep latency down.
    #[serde(default)]
    pub thinking_budget: u32,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    300
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            thinking_budget: 0,
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("thinking_budget", &self.thinking_budget)
            .finish()
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Credential, if one is set and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Keyword fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Confidence assigned to every fallback match.
    #[serde(default = "default_fallback_confidence")]
    pub confidence: f64,
    /// Ordered pattern groups; first match wins. Replaces the built-in list.
    #[serde(default = "default_groups")]
    pub groups: Vec<PatternGroup>,
}

fn default_fallback_confidence() -> f64 {
    0.6
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            confidence: default_fallback_confidence(),
            groups: default_groups(),
        }
    }
}

impl InterpreterConfig {
    /// Load config from a TOML file path. The environment overlay is not applied.
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

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (tests pass a map).
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.remote.api_key = Some(key);
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.remote.model = model;
        }
        if let Some(flag) = lookup(ENV_FALLBACK_ONLY) {
            let flag = flag.trim();
            self.fallback_only = flag.eq_ignore_ascii_case("true") || flag == "1";
        }
    }

    /// Reject configurations the interpreter cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: String| -> ConfigResult<()> { Err(ConfigError::InvalidConfiguration(msg)) };

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }

        self.limits.validate()?;

        if !self.fallback_only {
            if self.remote.credential().is_none() {
                return invalid(format!(
                    "no credential for the remote interpreter; set {ENV_API_KEY} or enable fallback_only"
                ));
            }
            if self.remote.endpoint.trim().is_empty() {
                return invalid("remote.endpoint must not be empty".into());
            }
            if self.remote.model.trim().is_empty() {
                return invalid("remote.model must not be empty".into());
            }
            if self.remote.timeout_ms == 0 {
                return invalid("remote.timeout_ms must be positive".into());
            }
        }

        // Compiles every group; surfaces bad regexes and inconsistent groups.
        FallbackParser::new(&self.fallback).map(|_| ())
    }
}
