//! Command normalizer: defaults, clamping, and field hygiene.

use vp_protocol::{Action, Command, SafetyLimits};

/// Bring `cmd` inside `limits`. Pure and idempotent.
///
/// A MOVE or TURN without a usable direction cannot be made safe and is
/// downgraded to NONE.
pub fn normalize(mut cmd: Command, limits: &SafetyLimits) -> Command {
    cmd.confidence = if cmd.confidence.is_nan() {
        0.0
    } else {
        cmd.confidence.clamp(0.0, 1.0)
    };

    let direction = match (cmd.action, cmd.direction) {
        (Action::Move, Some(d)) if d.is_linear() => Some(d),
        (Action::Turn, Some(d)) => d.as_rotation(),
        _ => None,
    };
    if cmd.action.requires_direction() && direction.is_none() {
        tracing::debug!(action = %cmd.action, "no usable direction, downgrading to NONE");
        cmd.action = Action::NoOp;
    }

    if !cmd.action.is_actionable() {
        cmd.direction = None;
        cmd.distance_m = None;
        cmd.angle_deg = None;
        cmd.speed_mps = None;
        cmd.low_confidence = false;
        return cmd;
    }
    cmd.direction = direction;

    let action = cmd.action;

    cmd.distance_m = action.accepts_distance().then(|| {
        let requested = cmd
            .distance_m
            .filter(|d| d.is_finite())
            .unwrap_or(limits.default_distance_m);
        requested.clamp(limits.min_distance_m, limits.max_distance_for(action))
    });

    cmd.angle_deg = action.accepts_angle().then(|| {
        let requested = cmd
            .angle_deg
            .filter(|a| a.is_finite())
            .unwrap_or(limits.default_angle_deg);
        requested.clamp(limits.min_angle_deg, limits.max_angle_deg)
    });

    cmd.speed_mps = match (action.accepts_speed(), cmd.distance_m) {
        (true, Some(distance)) => Some(
            cmd.speed_mps
                .filter(|s| s.is_finite())
                .map(|s| s.clamp(limits.min_speed_mps, limits.max_speed_mps))
                .unwrap_or_else(|| limits.adaptive_speed(distance)),
        ),
        _ => None,
    };

    cmd
}
