//! Flight dispatch settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightConfig {
    /// Yaw rate used for TURN commands.
    #[serde(default = "default_turn_rate_deg_s")]
    pub turn_rate_deg_s: f64,
    /// Simulator sleeps for the real duration of each primitive.
    #[serde(default)]
    pub realtime: bool,
}

fn default_turn_rate_deg_s() -> f64 {
    30.0
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            turn_rate_deg_s: default_turn_rate_deg_s(),
            realtime: false,
        }
    }
}

/// Flight settings that cannot drive a vehicle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightConfigError {
    #[error("turn_rate_deg_s must be a positive number, got {0}")]
    InvalidTurnRate(f64),
}

impl FlightConfig {
    pub fn validate(&self) -> Result<(), FlightConfigError> {
        if !self.turn_rate_deg_s.is_finite() || self.turn_rate_deg_s <= 0.0 {
            return Err(FlightConfigError::InvalidTurnRate(self.turn_rate_deg_s));
        }
        Ok(())
    }
}
