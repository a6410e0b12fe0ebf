//! Shared types for VoicePilot: the interpreted `Command`, the schema the
//! remote interpreter is asked to follow, and the safety envelope.

pub mod commands;
pub mod limits;
pub mod schema;

pub use commands::*;
pub use limits::*;
pub use schema::*;
