//! Safe operating envelope for dispatched commands.
//!
//! The normalizer clamps every command into these bounds; the flight
//! dispatcher re-checks them before anything reaches the vehicle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::{Action, Command};

/// Defaults and bounds for command parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Distance used when MOVE/TAKEOFF carries none.
    #[serde(default = "default_distance_m")]
    pub default_distance_m: f64,
    #[serde(default = "default_min_distance_m")]
    pub min_distance_m: f64,
    #[serde(default = "default_max_distance_m")]
    pub max_distance_m: f64,
    /// Ceiling for TAKEOFF altitude.
    #[serde(default = "default_max_altitude_m")]
    pub max_altitude_m: f64,
    /// Angle used when TURN carries none.
    #[serde(default = "default_angle_deg")]
    pub default_angle_deg: f64,
    #[serde(default = "default_min_angle_deg")]
    pub min_angle_deg: f64,
    #[serde(default = "default_max_angle_deg")]
    pub max_angle_deg: f64,
    #[serde(default = "default_min_speed_mps")]
    pub min_speed_mps: f64,
    /// Hard speed ceiling.
    #[serde(default = "default_max_speed_mps")]
    pub max_speed_mps: f64,
    /// Target time to cover a distance; speed = distance / goal before clamping.
    #[serde(default = "default_speed_time_goal_s")]
    pub speed_time_goal_s: f64,
}

fn default_distance_m() -> f64 {
    2.0
}
fn default_min_distance_m() -> f64 {
    0.1
}
fn default_max_distance_m() -> f64 {
    5.0
}
fn default_max_altitude_m() -> f64 {
    10.0
}
fn default_angle_deg() -> f64 {
    90.0
}
fn default_min_angle_deg() -> f64 {
    1.0
}
fn default_max_angle_deg() -> f64 {
    360.0
}
fn default_min_speed_mps() -> f64 {
    0.5
}
fn default_max_speed_mps() -> f64 {
    3.0
}
fn default_speed_time_goal_s() -> f64 {
    1.5
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            default_distance_m: default_distance_m(),
            min_distance_m: default_min_distance_m(),
            max_distance_m: default_max_distance_m(),
            max_altitude_m: default_max_altitude_m(),
            default_angle_deg: default_angle_deg(),
            min_angle_deg: default_min_angle_deg(),
            max_angle_deg: default_max_angle_deg(),
            min_speed_mps: default_min_speed_mps(),
            max_speed_mps: default_max_speed_mps(),
            speed_time_goal_s: default_speed_time_goal_s(),
        }
    }
}

/// A command that falls outside the envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimitViolation {
    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} is required for {action}")]
    Missing {
        field: &'static str,
        action: Action,
    },

    #[error("{field} is not meaningful for {action}")]
    Unexpected {
        field: &'static str,
        action: Action,
    },

    #[error("direction {direction} is not valid for {action}")]
    WrongDirection {
        direction: crate::Direction,
        action: Action,
    },
}

/// An envelope whose own values are inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimitsError {
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{bound} lower bound {min} exceeds upper bound {max}")]
    InvertedBounds {
        bound: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field} {value} outside [{min}, {max}]")]
    DefaultOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl SafetyLimits {
    /// Upper distance bound for an action (altitude ceiling for TAKEOFF).
    pub fn max_distance_for(&self, action: Action) -> f64 {
        if action == Action::Takeoff {
            self.max_altitude_m
        } else {
            self.max_distance_m
        }
    }

    /// Monotonic distance-to-speed mapping, bounded by the speed range.
    pub fn adaptive_speed(&self, distance_m: f64) -> f64 {
        (distance_m / self.speed_time_goal_s).clamp(self.min_speed_mps, self.max_speed_mps)
    }

    /// Internal consistency of the limits themselves.
    pub fn validate(&self) -> Result<(), LimitsError> {
        let values = [
            ("default_distance_m", self.default_distance_m),
            ("min_distance_m", self.min_distance_m),
            ("max_distance_m", self.max_distance_m),
            ("max_altitude_m", self.max_altitude_m),
            ("default_angle_deg", self.default_angle_deg),
            ("min_angle_deg", self.min_angle_deg),
            ("max_angle_deg", self.max_angle_deg),
            ("min_speed_mps", self.min_speed_mps),
            ("max_speed_mps", self.max_speed_mps),
            ("speed_time_goal_s", self.speed_time_goal_s),
        ];
        for (field, value) in values {
            if !value.is_finite() || value <= 0.0 {
                return Err(LimitsError::NotPositive { field, value });
            }
        }

        let ordered = [
            ("distance", self.min_distance_m, self.max_distance_m),
            ("altitude", self.min_distance_m, self.max_altitude_m),
            ("angle", self.min_angle_deg, self.max_angle_deg),
            ("speed", self.min_speed_mps, self.max_speed_mps),
        ];
        for (bound, min, max) in ordered {
            if min > max {
                return Err(LimitsError::InvertedBounds { bound, min, max });
            }
        }

        if !(self.min_distance_m..=self.max_distance_m).contains(&self.default_distance_m) {
            return Err(LimitsError::DefaultOutOfRange {
                field: "default_distance_m",
                value: self.default_distance_m,
                min: self.min_distance_m,
                max: self.max_distance_m,
            });
        }
        if !(self.min_angle_deg..=self.max_angle_deg).contains(&self.default_angle_deg) {
            return Err(LimitsError::DefaultOutOfRange {
                field: "default_angle_deg",
                value: self.default_angle_deg,
                min: self.min_angle_deg,
                max: self.max_angle_deg,
            });
        }
        Ok(())
    }

    /// Verify a normalized command lies within the envelope.
    pub fn check(&self, cmd: &Command) -> Result<(), LimitViolation> {
        let action = cmd.action;

        check_range("confidence", cmd.confidence, 0.0, 1.0)?;

        match (action.requires_direction(), cmd.direction) {
            (true, None) => {
                return Err(LimitViolation::Missing {
                    field: "direction",
                    action,
                });
            }
            (false, Some(_)) => {
                return Err(LimitViolation::Unexpected {
                    field: "direction",
                    action,
                });
            }
            (true, Some(direction)) => {
                let valid = match action {
                    Action::Turn => direction.is_rotational(),
                    _ => direction.is_linear(),
                };
                if !valid {
                    return Err(LimitViolation::WrongDirection { direction, action });
                }
            }
            (false, None) => {}
        }

        check_field(
            "distance_m",
            cmd.distance_m,
            action,
            action.accepts_distance(),
            self.min_distance_m,
            self.max_distance_for(action),
        )?;
        check_field(
            "angle_deg",
            cmd.angle_deg,
            action,
            action.accepts_angle(),
            self.min_angle_deg,
            self.max_angle_deg,
        )?;
        check_field(
            "speed_mps",
            cmd.speed_mps,
            action,
            action.accepts_speed(),
            self.min_speed_mps,
            self.max_speed_mps,
        )?;

        Ok(())
    }
}

fn check_field(
    field: &'static str,
    value: Option<f64>,
    action: Action,
    accepted: bool,
    min: f64,
    max: f64,
) -> Result<(), LimitViolation> {
    match (accepted, value) {
        (true, Some(v)) => check_range(field, v, min, max),
        (true, None) => Err(LimitViolation::Missing { field, action }),
        (false, Some(_)) => Err(LimitViolation::Unexpected { field, action }),
        (false, None) => Ok(()),
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), LimitViolation> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(LimitViolation::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Source};

    #[test]
    fn defaults_are_valid() {
        let limits = SafetyLimits::default();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.default_distance_m, 2.0);
        assert_eq!(limits.max_angle_deg, 360.0);
    }

    #[test]
    fn inverted_bounds_rejected() {
        let limits = SafetyLimits {
            min_speed_mps: 4.0,
            ..SafetyLimits::default()
        };
        let err = limits.validate().unwrap_err();
        assert!(matches!(err, LimitsError::InvertedBounds { bound: "speed", .. }));
        assert!(err.to_string().contains("speed"), "{err}");
    }

    #[test]
    fn default_outside_bounds_rejected() {
        let limits = SafetyLimits {
            default_angle_deg: 720.0,
            ..SafetyLimits::default()
        };
        assert_eq!(
            limits.validate(),
            Err(LimitsError::DefaultOutOfRange {
                field: "default_angle_deg",
                value: 720.0,
                min: 1.0,
                max: 360.0,
            })
        );
    }

    #[test]
    fn non_finite_limit_rejected() {
        let limits = SafetyLimits {
            max_altitude_m: f64::NAN,
            ..SafetyLimits::default()
        };
        assert!(matches!(
            limits.validate(),
            Err(LimitsError::NotPositive { field: "max_altitude_m", .. })
        ));
    }

    #[test]
    fn adaptive_speed_is_bounded_and_monotonic() {
        let limits = SafetyLimits::default();
        assert_eq!(limits.adaptive_speed(0.1), 0.5);
        assert!((limits.adaptive_speed(3.0) - 2.0).abs() < 1e-9);
        assert_eq!(limits.adaptive_speed(100.0), 3.0);

        let mut previous = 0.0;
        for step in 0..100 {
            let speed = limits.adaptive_speed(step as f64 * 0.1);
            assert!(speed >= previous);
            previous = speed;
        }
    }

    #[test]
    fn check_accepts_bounded_move() {
        let limits = SafetyLimits::default();
        let cmd = Command::new(Action::Move, Source::Fallback, 0.6, "forward")
            .with_direction(Direction::Forward)
            .with_distance(2.0)
            .with_speed(1.5);
        assert!(limits.check(&cmd).is_ok());
    }

    #[test]
    fn check_rejects_raw_angle() {
        let limits = SafetyLimits::default();
        let cmd = Command::new(Action::Turn, Source::Remote, 0.9, "spin")
            .with_direction(Direction::Clockwise)
            .with_angle(1000.0);
        assert!(matches!(
            limits.check(&cmd),
            Err(LimitViolation::OutOfRange {
                field: "angle_deg",
                ..
            })
        ));
    }

    #[test]
    fn check_rejects_linear_turn() {
        let limits = SafetyLimits::default();
        let cmd = Command::new(Action::Turn, Source::Remote, 0.9, "turn up")
            .with_direction(Direction::Up)
            .with_angle(90.0);
        assert!(matches!(
            limits.check(&cmd),
            Err(LimitViolation::WrongDirection { .. })
        ));
    }

    #[test]
    fn check_rejects_movement_fields_on_noop() {
        let limits = SafetyLimits::default();
        let mut cmd = Command::not_a_command("chatter");
        assert!(limits.check(&cmd).is_ok());
        cmd.distance_m = Some(1.0);
        assert!(matches!(
            limits.check(&cmd),
            Err(LimitViolation::Unexpected { .. })
        ));
    }

    #[test]
    fn takeoff_uses_altitude_ceiling() {
        let limits = SafetyLimits::default();
        let cmd = Command::new(Action::Takeoff, Source::Fallback, 0.6, "take off")
            .with_distance(8.0)
            .with_speed(3.0);
        assert!(limits.check(&cmd).is_ok());
    }

    #[test]
    fn limits_from_partial_toml_like_json() {
        let limits: SafetyLimits =
            serde_json::from_str(r#"{"max_angle_deg": 180.0}"#).unwrap();
        assert_eq!(limits.max_angle_deg, 180.0);
        assert_eq!(limits.default_distance_m, 2.0);
    }
}
