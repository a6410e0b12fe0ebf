//! Dispatch-time safety gate.
//!
//! Commands are normalized upstream, but nothing reaches a controller
//! without passing this check again:
//! - NONE is never dispatched
//! - every numeric field must lie inside `SafetyLimits`
//! - directions must fit the action (linear for MOVE, rotational for TURN)

use vp_protocol::{Command, SafetyLimits};

use crate::error::{FlightError, FlightResult};

/// Validates that a command may be sent to the vehicle.
pub fn check_dispatchable(cmd: &Command, limits: &SafetyLimits) -> FlightResult<()> {
    if !cmd.is_actionable() {
        return Err(FlightError::NotDispatchable(cmd.action));
    }
    limits.check(cmd)?;
    Ok(())
}
