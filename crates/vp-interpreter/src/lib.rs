//! Transcript interpretation for VoicePilot.
//!
//! Turns one spoken-language transcript into one normalized `Command`:
//! a remote language model is asked first, its reply is validated against the
//! command schema, and a deterministic keyword parser takes over whenever the
//! remote path is unavailable, rejected, or declines.

pub mod arbiter;
pub mod config;
pub mod error;
pub mod fallback;
pub mod normalizer;
pub mod prompt;
pub mod quantity;
pub mod remote;
pub mod validator;

// Re-export key types for convenience
pub use arbiter::{Arbiter, Interpretation, RemoteOutcome};
pub use config::{FallbackConfig, InterpreterConfig, RemoteConfig};
pub use error::{ConfigError, ConfigResult, InterpretError};
pub use fallback::{FallbackParser, PatternGroup};
pub use normalizer::normalize;
pub use quantity::Quantity;
pub use remote::{GeminiClient, RemoteInterpreter};
pub use validator::{ResponseValidator, extract_json};
