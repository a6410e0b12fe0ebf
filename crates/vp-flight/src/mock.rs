//! Mock flight controller for testing.
//!
//! Records every primitive call and can be scripted to fail the next call.
//! All tests use this instead of a real autopilot link.

use std::sync::Mutex;

use async_trait::async_trait;
use vp_protocol::Direction;

use crate::controller::FlightController;
use crate::error::{FlightError, FlightResult};

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightCall {
    MoveBy {
        direction: Direction,
        distance_m: f64,
        speed_mps: f64,
    },
    Rotate {
        direction: Direction,
        angle_deg: f64,
        rate_deg_s: f64,
    },
    Takeoff {
        altitude_m: f64,
    },
    Land,
    ReturnHome,
    Hover,
    Stop,
}

impl FlightCall {
    /// Whether this call moves the vehicle.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            FlightCall::MoveBy { .. } | FlightCall::Rotate { .. } | FlightCall::Takeoff { .. }
        )
    }
}

/// Mock controller with call recording and scripted failures.
#[derive(Default)]
pub struct MockFlightController {
    /// All primitive calls, in order (for test assertions).
    calls: Mutex<Vec<FlightCall>>,
    /// Error returned by the next call, if set.
    next_error: Mutex<Option<FlightError>>,
}

impl MockFlightController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next primitive call fail with `error` (it is still recorded).
    pub fn fail_next(&self, error: FlightError) {
        *self
            .next_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(error);
    }

    /// Copies of all recorded calls.
    pub fn calls(&self) -> Vec<FlightCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last_call(&self) -> Option<FlightCall> {
        self.calls().last().cloned()
    }

    fn record(&self, call: FlightCall) -> FlightResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
        match self
            .next_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FlightController for MockFlightController {
    async fn move_by(
        &self,
        direction: Direction,
        distance_m: f64,
        speed_mps: f64,
    ) -> FlightResult<()> {
        self.record(FlightCall::MoveBy {
            direction,
            distance_m,
            speed_mps,
        })
    }

    async fn rotate(
        &self,
        direction: Direction,
        angle_deg: f64,
        rate_deg_s: f64,
    ) -> FlightResult<()> {
        self.record(FlightCall::Rotate {
            direction,
            angle_deg,
            rate_deg_s,
        })
    }

    async fn takeoff(&self, altitude_m: f64) -> FlightResult<()> {
        self.record(FlightCall::Takeoff { altitude_m })
    }

    async fn land(&self) -> FlightResult<()> {
        self.record(FlightCall::Land)
    }

    async fn return_home(&self) -> FlightResult<()> {
        self.record(FlightCall::ReturnHome)
    }

    async fn hover(&self) -> FlightResult<()> {
        self.record(FlightCall::Hover)
    }

    async fn stop(&self) -> FlightResult<()> {
        self.record(FlightCall::Stop)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
