//! Vehicle control abstraction.
//!
//! `FlightController` is the only way a command reaches the vehicle. Two impls:
//! - `SimulatedVehicle`: logs primitives and tracks pose (in `sim.rs`)
//! - `MockFlightController`: records calls for assertions (in `mock.rs`)

use async_trait::async_trait;
use vp_protocol::Direction;

use crate::error::FlightResult;

/// Primitive flight operations.
///
/// Arguments arrive already checked against the safety envelope by the
/// dispatcher.
#[async_trait]
pub trait FlightController: Send + Sync {
    /// Translate along a linear direction, then stop.
    async fn move_by(&self, direction: Direction, distance_m: f64, speed_mps: f64)
    -> FlightResult<()>;

    /// Yaw in place by `angle_deg` at `rate_deg_s`.
    async fn rotate(&self, direction: Direction, angle_deg: f64, rate_deg_s: f64)
    -> FlightResult<()>;

    async fn takeoff(&self, altitude_m: f64) -> FlightResult<()>;

    async fn land(&self) -> FlightResult<()>;

    async fn return_home(&self) -> FlightResult<()>;

    /// Zero velocity, hold position.
    async fn hover(&self) -> FlightResult<()>;

    /// Leave the controlled mode (end of session).
    async fn stop(&self) -> FlightResult<()>;

    /// Name of this controller (for logging).
    fn name(&self) -> &str;
}
