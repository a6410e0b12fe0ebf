//! Interpreter error types.

use thiserror::Error;
use vp_protocol::LimitsError;

/// Per-transcript failures of the remote interpretation path.
///
/// All variants are recovered inside the arbiter by falling back to the
/// keyword parser; callers never see them as failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    /// Transport error, timeout, missing credential, or unusable envelope.
    #[error("remote interpreter unavailable: {0}")]
    RemoteUnavailable(String),

    /// Payload is not parseable or lacks required fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Payload parsed but does not fit the command schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl InterpretError {
    /// Short label for structured logging.
    pub fn category(&self) -> &'static str {
        match self {
            InterpretError::RemoteUnavailable(_) => "remote_unavailable",
            InterpretError::MalformedResponse(_) => "malformed_response",
            InterpretError::SchemaViolation(_) => "schema_violation",
        }
    }
}

/// Startup configuration errors. Fatal, never raised per transcript.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: limits: {0}")]
    Limits(#[from] LimitsError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
