//! Velocity mapping and timing for flight primitives.
//!
//! Velocities are NED (north, east, down): forward is +north, right is +east,
//! and up is negative down.

use std::time::Duration;

use serde::Serialize;
use vp_protocol::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VelocityNed {
    pub north_mps: f64,
    pub east_mps: f64,
    pub down_mps: f64,
}

impl VelocityNed {
    pub const ZERO: VelocityNed = VelocityNed {
        north_mps: 0.0,
        east_mps: 0.0,
        down_mps: 0.0,
    };

    /// Velocity for a linear direction; `None` for rotations.
    pub fn for_direction(direction: Direction, speed_mps: f64) -> Option<Self> {
        let (north, east, down) = match direction {
            Direction::Forward => (speed_mps, 0.0, 0.0),
            Direction::Backward => (-speed_mps, 0.0, 0.0),
            Direction::Right => (0.0, speed_mps, 0.0),
            Direction::Left => (0.0, -speed_mps, 0.0),
            Direction::Up => (0.0, 0.0, -speed_mps),
            Direction::Down => (0.0, 0.0, speed_mps),
            Direction::Clockwise | Direction::Counterclockwise => return None,
        };
        Some(Self {
            north_mps: north,
            east_mps: east,
            down_mps: down,
        })
    }

    /// Displacement after flying at this velocity for `duration`.
    pub fn displacement(&self, duration: Duration) -> [f64; 3] {
        let secs = duration.as_secs_f64();
        [
            self.north_mps * secs,
            self.east_mps * secs,
            self.down_mps * secs,
        ]
    }
}

/// Time to cover `distance_m` at `speed_mps`. Zero for non-positive inputs.
pub fn travel_time(distance_m: f64, speed_mps: f64) -> Duration {
    seconds(distance_m / speed_mps)
}

/// Time to yaw `angle_deg` at `rate_deg_s`.
pub fn turn_time(angle_deg: f64, rate_deg_s: f64) -> Duration {
    seconds(angle_deg / rate_deg_s)
}

fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

/// Signed yaw change: clockwise adds, counterclockwise subtracts.
pub fn yaw_delta(direction: Direction, angle_deg: f64) -> Option<f64> {
    match direction {
        Direction::Clockwise => Some(angle_deg),
        Direction::Counterclockwise => Some(-angle_deg),
        _ => None,
    }
}

/// Wrap a heading into [0, 360).
pub fn wrap_heading(heading_deg: f64) -> f64 {
    let wrapped = heading_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
