//! Flight dispatch error types.

use thiserror::Error;
use vp_protocol::{Action, LimitViolation};

/// Errors that can occur while dispatching a command to the vehicle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightError {
    #[error("vehicle must be airborne for {action}")]
    NotAirborne { action: Action },

    #[error("unsafe command refused: {0}")]
    UnsafeCommand(#[from] LimitViolation),

    #[error("{0} is not a dispatchable command")]
    NotDispatchable(Action),

    #[error("flight controller error: {0}")]
    Controller(String),
}

/// Convenience alias for flight results.
pub type FlightResult<T> = Result<T, FlightError>;
