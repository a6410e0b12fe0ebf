//! Arbiter: remote-first interpretation with keyword fallback.
//!
//! Tries the remote interpreter first. If it fails, times out, returns an
//! unusable payload, or says the speech is not a command, the keyword
//! fallback decides. The remote failure is logged and recorded in the
//! returned `RemoteOutcome`, never surfaced as an error.

use std::time::Duration;

use vp_protocol::{Command, SafetyLimits};

use crate::config::InterpreterConfig;
use crate::error::{ConfigError, ConfigResult, InterpretError};
use crate::fallback::FallbackParser;
use crate::normalizer::normalize;
use crate::remote::{GeminiClient, RemoteInterpreter};
use crate::validator::ResponseValidator;

/// What happened on the remote path for one transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// Remote command was used.
    Accepted,
    /// Remote call failed or its payload was rejected; fallback used.
    Rejected(InterpretError),
    /// Remote said "not a command"; fallback result is authoritative.
    Declined,
    /// Fallback-only mode, no remote configured.
    Disabled,
    /// Empty transcript, nothing was asked.
    Skipped,
}

impl RemoteOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RemoteOutcome::Rejected(_))
    }
}

/// Final, normalized result for one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub command: Command,
    pub remote: RemoteOutcome,
}

pub struct Arbiter {
    remote: Option<Box<dyn RemoteInterpreter>>,
    fallback: FallbackParser,
    validator: ResponseValidator,
    limits: SafetyLimits,
    confidence_threshold: f64,
    timeout: Duration,
}

impl Arbiter {
    /// Build from a validated config, creating the Gemini client unless the
    /// config is fallback-only.
    pub fn from_config(config: &InterpreterConfig) -> ConfigResult<Self> {
        config.validate()?;
        let remote: Option<Box<dyn RemoteInterpreter>> = if config.fallback_only {
            None
        } else {
            Some(Box::new(GeminiClient::new(config.remote.clone())?))
        };
        Self::new(config, remote)
    }

    /// Build with an explicit remote interpreter (ignored in fallback-only mode).
    pub fn new(
        config: &InterpreterConfig,
        remote: Option<Box<dyn RemoteInterpreter>>,
    ) -> ConfigResult<Self> {
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "confidence_threshold must be within [0, 1], got {}",
                config.confidence_threshold
            )));
        }
        config.limits.validate()?;

        let remote = if config.fallback_only { None } else { remote };
        Ok(Self {
            remote,
            fallback: FallbackParser::new(&config.fallback)?,
            validator: ResponseValidator::new(),
            limits: config.limits.clone(),
            confidence_threshold: config.confidence_threshold,
            timeout: config.remote.timeout(),
        })
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub fn is_fallback_only(&self) -> bool {
        self.remote.is_none()
    }

    /// Interpret one transcript. Never fails; the command is always normalized.
    pub async fn interpret(&self, transcript: &str) -> Interpretation {
        if transcript.trim().is_empty() {
            return Interpretation {
                command: Command::not_a_command(transcript),
                remote: RemoteOutcome::Skipped,
            };
        }

        let Some(remote) = self.remote.as_deref() else {
            return self.fall_back(transcript, RemoteOutcome::Disabled);
        };

        match self.ask_remote(remote, transcript).await {
            Ok(cmd) => {
                let cmd = normalize(cmd, &self.limits);
                if cmd.is_actionable() {
                    tracing::debug!(command = %cmd, "using remote interpretation");
                    Interpretation {
                        command: self.flag_confidence(cmd),
                        remote: RemoteOutcome::Accepted,
                    }
                } else {
                    tracing::debug!("remote declined, consulting fallback");
                    self.fall_back(transcript, RemoteOutcome::Declined)
                }
            }
            Err(e) => {
                tracing::warn!(
                    category = e.category(),
                    error = %e,
                    remote = remote.name(),
                    "remote interpretation failed, using fallback"
                );
                self.fall_back(transcript, RemoteOutcome::Rejected(e))
            }
        }
    }

    async fn ask_remote(
        &self,
        remote: &dyn RemoteInterpreter,
        transcript: &str,
    ) -> Result<Command, InterpretError> {
        let raw = tokio::time::timeout(self.timeout, remote.interpret(transcript))
            .await
            .map_err(|_| {
                InterpretError::RemoteUnavailable(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;
        self.validator.validate(&raw, transcript)
    }

    fn fall_back(&self, transcript: &str, remote: RemoteOutcome) -> Interpretation {
        let cmd = normalize(self.fallback.parse(transcript), &self.limits);
        tracing::debug!(command = %cmd, "using fallback interpretation");
        Interpretation {
            command: self.flag_confidence(cmd),
            remote,
        }
    }

    fn flag_confidence(&self, mut cmd: Command) -> Command {
        if cmd.is_actionable() && cmd.confidence < self.confidence_threshold {
            tracing::info!(
                confidence = cmd.confidence,
                threshold = self.confidence_threshold,
                command = %cmd,
                "low-confidence command"
            );
            cmd.low_confidence = true;
        }
        cmd
    }
}
