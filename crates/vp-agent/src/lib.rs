//! VoicePilot agent: wires the interpreter and flight dispatch into a
//! listening session driven by transcripts.
//!
//! Re-exports all modules so external crates (e.g. `vp-e2e-tests`) can run
//! a `Session` without going through the binary.

pub mod config;
pub mod session;
pub mod transcript;

// Re-export key types for convenience
pub use config::{AgentConfig, LowConfidencePolicy, SessionConfig};
pub use session::{Session, SessionSummary, TurnOutcome};
pub use transcript::{LineTranscripts, ScriptedTranscripts, TranscriptSource};
