//! Dispatcher: maps a normalized `Command` onto flight primitives.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vp_protocol::{Action, Command, LimitViolation, SafetyLimits};

use crate::config::FlightConfig;
use crate::controller::FlightController;
use crate::error::{FlightError, FlightResult};
use crate::motion;
use crate::safety;

/// What was sent to the controller for one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub action: Action,
    /// Controller primitive that was invoked.
    pub primitive: &'static str,
    /// Expected duration of the primitive (zero for instantaneous ones).
    pub expected_duration: Duration,
    pub dispatched_at: DateTime<Utc>,
}

pub struct Dispatcher {
    controller: Arc<dyn FlightController>,
    limits: SafetyLimits,
    turn_rate_deg_s: f64,
}

impl Dispatcher {
    pub fn new(
        controller: Arc<dyn FlightController>,
        limits: SafetyLimits,
        config: &FlightConfig,
    ) -> Self {
        Self {
            controller,
            limits,
            turn_rate_deg_s: config.turn_rate_deg_s,
        }
    }

    pub fn controller(&self) -> &Arc<dyn FlightController> {
        &self.controller
    }

    /// Re-check `cmd` against the safety envelope and send it to the controller.
    pub async fn dispatch(&self, cmd: &Command) -> FlightResult<DispatchReport> {
        safety::check_dispatchable(cmd, &self.limits).inspect_err(|e| {
            tracing::warn!(error = %e, command = %cmd, "dispatch refused");
        })?;

        let dispatched_at = Utc::now();
        let controller = self.controller.as_ref();
        let (primitive, expected_duration) = match cmd.action {
            Action::Move => {
                let (direction, distance, speed) = (
                    required(cmd.direction, "direction", cmd.action)?,
                    required(cmd.distance_m, "distance_m", cmd.action)?,
                    required(cmd.speed_mps, "speed_mps", cmd.action)?,
                );
                controller.move_by(direction, distance, speed).await?;
                ("move_by", motion::travel_time(distance, speed))
            }
            Action::Turn => {
                let direction = required(cmd.direction, "direction", cmd.action)?;
                let angle = required(cmd.angle_deg, "angle_deg", cmd.action)?;
                controller
                    .rotate(direction, angle, self.turn_rate_deg_s)
                    .await?;
                ("rotate", motion::turn_time(angle, self.turn_rate_deg_s))
            }
            Action::Takeoff => {
                let altitude = required(cmd.distance_m, "distance_m", cmd.action)?;
                controller.takeoff(altitude).await?;
                let speed = cmd.speed_mps.unwrap_or(self.limits.min_speed_mps);
                ("takeoff", motion::travel_time(altitude, speed))
            }
            Action::Land => {
                controller.land().await?;
                ("land", Duration::ZERO)
            }
            Action::ReturnHome => {
                controller.return_home().await?;
                ("return_home", Duration::ZERO)
            }
            Action::Hover => {
                controller.hover().await?;
                ("hover", Duration::ZERO)
            }
            Action::Exit => {
                controller.stop().await?;
                ("stop", Duration::ZERO)
            }
            Action::NoOp => return Err(FlightError::NotDispatchable(Action::NoOp)),
        };

        tracing::info!(
            controller = controller.name(),
            primitive,
            command = %cmd,
            "dispatched"
        );
        Ok(DispatchReport {
            action: cmd.action,
            primitive,
            expected_duration,
            dispatched_at,
        })
    }
}

/// Fields the safety check has already guaranteed; absence is a logic error
/// surfaced as an unsafe command rather than a panic.
fn required<T>(value: Option<T>, field: &'static str, action: Action) -> FlightResult<T> {
    value.ok_or(FlightError::UnsafeCommand(LimitViolation::Missing {
        field,
        action,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FlightCall, MockFlightController};
    use vp_protocol::{Direction, Source};

    fn dispatcher() -> (Dispatcher, Arc<MockFlightController>) {
        let mock = Arc::new(MockFlightController::new());
        let dispatcher = Dispatcher::new(
            mock.clone(),
            SafetyLimits::default(),
            &FlightConfig::default(),
        );
        (dispatcher, mock)
    }

    #[tokio::test]
    async fn move_maps_to_move_by() {
        let (dispatcher, mock) = dispatcher();
        let cmd = Command::new(Action::Move, Source::Remote, 0.9, "forward 3")
            .with_direction(Direction::Forward)
            .with_distance(3.0)
            .with_speed(2.0);
        let report = dispatcher.dispatch(&cmd).await.unwrap();
        assert_eq!(report.primitive, "move_by");
        assert_eq!(report.expected_duration, Duration::from_millis(1500));
        assert_eq!(
            mock.calls(),
            vec![FlightCall::MoveBy {
                direction: Direction::Forward,
                distance_m: 3.0,
                speed_mps: 2.0
            }]
        );
    }

    #[tokio::test]
    async fn turn_uses_configured_rate() {
        let (dispatcher, mock) = dispatcher();
        let cmd = Command::new(Action::Turn, Source::Fallback, 0.6, "turn around")
            .with_direction(Direction::Clockwise)
            .with_angle(180.0);
        let report = dispatcher.dispatch(&cmd).await.unwrap();
        assert_eq!(report.expected_duration, Duration::from_secs(6));
        assert_eq!(
            mock.last_call(),
            Some(FlightCall::Rotate {
                direction: Direction::Clockwise,
                angle_deg: 180.0,
                rate_deg_s: 30.0
            })
        );
    }

    #[tokio::test]
    async fn simple_actions_map_one_to_one() {
        let (dispatcher, mock) = dispatcher();
        let takeoff = Command::new(Action::Takeoff, Source::Fallback, 0.6, "take off")
            .with_distance(2.0)
            .with_speed(1.0);
        dispatcher.dispatch(&takeoff).await.unwrap();
        for action in [Action::Hover, Action::ReturnHome, Action::Land, Action::Exit] {
            let cmd = Command::new(action, Source::Fallback, 0.6, action.as_str());
            dispatcher.dispatch(&cmd).await.unwrap();
        }
        assert_eq!(
            mock.calls(),
            vec![
                FlightCall::Takeoff { altitude_m: 2.0 },
                FlightCall::Hover,
                FlightCall::ReturnHome,
                FlightCall::Land,
                FlightCall::Stop,
            ]
        );
    }

    #[tokio::test]
    async fn none_is_never_dispatched() {
        let (dispatcher, mock) = dispatcher();
        let err = dispatcher
            .dispatch(&Command::not_a_command("what a view"))
            .await
            .unwrap_err();
        assert_eq!(err, FlightError::NotDispatchable(Action::NoOp));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn out_of_bounds_is_refused_before_controller() {
        let (dispatcher, mock) = dispatcher();
        let cmd = Command::new(Action::Move, Source::Remote, 0.9, "way up")
            .with_direction(Direction::Up)
            .with_distance(50.0)
            .with_speed(2.0);
        let err = dispatcher.dispatch(&cmd).await.unwrap_err();
        assert!(matches!(
            err,
            FlightError::UnsafeCommand(LimitViolation::OutOfRange { field: "distance_m", .. })
        ));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn controller_errors_propagate() {
        let (dispatcher, mock) = dispatcher();
        mock.fail_next(FlightError::Controller("offboard rejected".into()));
        let cmd = Command::new(Action::Hover, Source::Fallback, 0.6, "hover");
        let err = dispatcher.dispatch(&cmd).await.unwrap_err();
        assert_eq!(err, FlightError::Controller("offboard rejected".into()));
    }
}
