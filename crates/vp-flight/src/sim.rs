//! Simulated vehicle: logs each primitive and tracks a simple pose.
//!
//! Used by the `voicepilot` binary in place of an autopilot link. Position is
//! NED in meters relative to the launch point; `down` is never positive (the
//! ground stops descent). Motion is refused while on the ground.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use vp_protocol::{Action, Direction};

use crate::controller::FlightController;
use crate::error::{FlightError, FlightResult};
use crate::motion::{self, VelocityNed};

/// Snapshot of the simulated vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleState {
    pub airborne: bool,
    /// Degrees in [0, 360), clockwise from north.
    pub heading_deg: f64,
    /// [north, east, down] in meters.
    pub position_ned: [f64; 3],
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            airborne: false,
            heading_deg: 0.0,
            position_ned: [0.0; 3],
        }
    }
}

impl VehicleState {
    pub fn altitude_m(&self) -> f64 {
        -self.position_ned[2]
    }
}

pub struct SimulatedVehicle {
    state: Mutex<VehicleState>,
    realtime: bool,
}

impl SimulatedVehicle {
    /// `realtime` makes each primitive sleep for its real duration.
    pub fn new(realtime: bool) -> Self {
        Self {
            state: Mutex::new(VehicleState::default()),
            realtime,
        }
    }

    pub fn state(&self) -> VehicleState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VehicleState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn require_airborne(&self, action: Action) -> FlightResult<()> {
        if self.lock().airborne {
            Ok(())
        } else {
            Err(FlightError::NotAirborne { action })
        }
    }

    async fn pause(&self, duration: Duration) {
        if self.realtime && !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

impl Default for SimulatedVehicle {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl FlightController for SimulatedVehicle {
    async fn move_by(
        &self,
        direction: Direction,
        distance_m: f64,
        speed_mps: f64,
    ) -> FlightResult<()> {
        self.require_airborne(Action::Move)?;
        let velocity = VelocityNed::for_direction(direction, speed_mps).ok_or_else(|| {
            FlightError::Controller(format!("{direction} is not a linear direction"))
        })?;
        let duration = motion::travel_time(distance_m, speed_mps);
        tracing::info!(
            direction = %direction,
            distance_m,
            speed_mps,
            duration_s = duration.as_secs_f64(),
            "sim: moving"
        );

        self.pause(duration).await;

        let mut state = self.lock();
        let delta = velocity.displacement(duration);
        for (axis, d) in state.position_ned.iter_mut().zip(delta) {
            *axis += d;
        }
        // Ground stops descent.
        state.position_ned[2] = state.position_ned[2].min(0.0);
        Ok(())
    }

    async fn rotate(
        &self,
        direction: Direction,
        angle_deg: f64,
        rate_deg_s: f64,
    ) -> FlightResult<()> {
        self.require_airborne(Action::Turn)?;
        let delta = motion::yaw_delta(direction, angle_deg).ok_or_else(|| {
            FlightError::Controller(format!("{direction} is not a rotation"))
        })?;
        let duration = motion::turn_time(angle_deg, rate_deg_s);

        self.pause(duration).await;

        let mut state = self.lock();
        state.heading_deg = motion::wrap_heading(state.heading_deg + delta);
        tracing::info!(
            direction = %direction,
            angle_deg,
            heading_deg = state.heading_deg,
            duration_s = duration.as_secs_f64(),
            "sim: turned"
        );
        Ok(())
    }

    async fn takeoff(&self, altitude_m: f64) -> FlightResult<()> {
        tracing::info!(altitude_m, "sim: taking off");
        let mut state = self.lock();
        state.airborne = true;
        state.position_ned[2] = -altitude_m;
        Ok(())
    }

    async fn land(&self) -> FlightResult<()> {
        let mut state = self.lock();
        if state.airborne {
            tracing::info!(altitude_m = state.altitude_m(), "sim: landing");
        } else {
            tracing::debug!("sim: already on the ground");
        }
        state.airborne = false;
        state.position_ned[2] = 0.0;
        Ok(())
    }

    async fn return_home(&self) -> FlightResult<()> {
        self.require_airborne(Action::ReturnHome)?;
        tracing::info!("sim: returning to launch");
        let mut state = self.lock();
        state.position_ned = [0.0; 3];
        state.airborne = false;
        Ok(())
    }

    async fn hover(&self) -> FlightResult<()> {
        tracing::info!(velocity = ?VelocityNed::ZERO, "sim: holding position");
        Ok(())
    }

    async fn stop(&self) -> FlightResult<()> {
        tracing::info!("sim: leaving controlled mode");
        Ok(())
    }

    fn name(&self) -> &str {
        "simulator"
    }
}
