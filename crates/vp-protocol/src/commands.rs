use std::fmt;

use serde::{Deserialize, Serialize};

/// What the vehicle is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Translate along a linear direction.
    Move,
    /// Yaw in place.
    Turn,
    /// Take off to an altitude (carried in `distance_m`).
    Takeoff,
    Land,
    ReturnHome,
    /// Stop motion and hold position.
    Hover,
    /// End the voice-control session.
    Exit,
    /// Not a command: conversational speech, never dispatched.
    #[serde(rename = "NONE")]
    NoOp,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Move,
        Action::Turn,
        Action::Takeoff,
        Action::Land,
        Action::ReturnHome,
        Action::Hover,
        Action::Exit,
        Action::NoOp,
    ];

    /// Wire literal used in the remote schema and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Move => "MOVE",
            Action::Turn => "TURN",
            Action::Takeoff => "TAKEOFF",
            Action::Land => "LAND",
            Action::ReturnHome => "RETURN_HOME",
            Action::Hover => "HOVER",
            Action::Exit => "EXIT",
            Action::NoOp => "NONE",
        }
    }

    /// Lenient literal lookup: case-insensitive, `-` and spaces read as `_`,
    /// plus a few aliases language models tend to emit.
    pub fn parse_literal(raw: &str) -> Option<Action> {
        let key = canonical_literal(raw);
        let action = match key.as_str() {
            "MOVE" | "GO" | "FLY" => Action::Move,
            "TURN" | "ROTATE" | "YAW" => Action::Turn,
            "TAKEOFF" | "TAKE_OFF" | "LAUNCH" => Action::Takeoff,
            "LAND" => Action::Land,
            "RETURN_HOME" | "RETURN_TO_HOME" | "RETURN_TO_LAUNCH" | "RTH" | "RTL" => {
                Action::ReturnHome
            }
            "HOVER" | "STOP" | "HOLD" => Action::Hover,
            "EXIT" | "QUIT" => Action::Exit,
            "NONE" | "NO_OP" | "NOOP" | "NULL" => Action::NoOp,
            _ => return None,
        };
        Some(action)
    }

    pub fn is_actionable(self) -> bool {
        self != Action::NoOp
    }

    pub fn requires_direction(self) -> bool {
        matches!(self, Action::Move | Action::Turn)
    }

    /// `distance_m` is meaningful (distance for MOVE, altitude for TAKEOFF).
    pub fn accepts_distance(self) -> bool {
        matches!(self, Action::Move | Action::Takeoff)
    }

    pub fn accepts_angle(self) -> bool {
        self == Action::Turn
    }

    /// Speed is derived for actions that travel a distance.
    pub fn accepts_speed(self) -> bool {
        self.accepts_distance()
    }

    /// Actions after which the listening session hands control back.
    pub fn ends_session(self) -> bool {
        matches!(self, Action::Exit | Action::Land | Action::ReturnHome)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of travel (MOVE) or rotation sense (TURN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    Clockwise,
    Counterclockwise,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
        Direction::Clockwise,
        Direction::Counterclockwise,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Backward => "BACKWARD",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Clockwise => "CLOCKWISE",
            Direction::Counterclockwise => "COUNTERCLOCKWISE",
        }
    }

    pub fn parse_literal(raw: &str) -> Option<Direction> {
        let key = canonical_literal(raw);
        let direction = match key.as_str() {
            "FORWARD" | "FORWARDS" | "AHEAD" => Direction::Forward,
            "BACKWARD" | "BACKWARDS" | "BACK" => Direction::Backward,
            "LEFT" => Direction::Left,
            "RIGHT" => Direction::Right,
            "UP" | "ASCEND" => Direction::Up,
            "DOWN" | "DESCEND" => Direction::Down,
            "CLOCKWISE" | "CW" => Direction::Clockwise,
            "COUNTERCLOCKWISE" | "COUNTER_CLOCKWISE" | "ANTICLOCKWISE" | "ANTI_CLOCKWISE"
            | "CCW" => Direction::Counterclockwise,
            _ => return None,
        };
        Some(direction)
    }

    pub fn is_rotational(self) -> bool {
        matches!(self, Direction::Clockwise | Direction::Counterclockwise)
    }

    pub fn is_linear(self) -> bool {
        !self.is_rotational()
    }

    /// Rotation sense for a TURN. "Turn left" is counterclockwise seen from above.
    pub fn as_rotation(self) -> Option<Direction> {
        match self {
            Direction::Left | Direction::Counterclockwise => Some(Direction::Counterclockwise),
            Direction::Right | Direction::Clockwise => Some(Direction::Clockwise),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which interpreter produced a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    Remote,
    Fallback,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Remote => f.write_str("REMOTE"),
            Source::Fallback => f.write_str("FALLBACK"),
        }
    }
}

/// A single interpreted instruction for the vehicle.
///
/// Built fresh for each transcript. Numeric fields are only guaranteed to be
/// within `SafetyLimits` once the command has been normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    /// Required for MOVE (linear) and TURN (rotational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Travel distance for MOVE, target altitude for TAKEOFF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    /// Yaw angle for TURN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    /// Trust in this interpretation (0.0 - 1.0).
    pub confidence: f64,
    pub source: Source,
    /// Transcript the command was derived from.
    pub raw_transcript: String,
    /// Free-text explanation from the remote interpreter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Actionable but below the configured confidence threshold.
    #[serde(default)]
    pub low_confidence: bool,
}

impl Command {
    pub fn new(
        action: Action,
        source: Source,
        confidence: f64,
        raw_transcript: impl Into<String>,
    ) -> Self {
        Self {
            action,
            direction: None,
            distance_m: None,
            angle_deg: None,
            speed_mps: None,
            confidence,
            source,
            raw_transcript: raw_transcript.into(),
            rationale: None,
            low_confidence: false,
        }
    }

    /// The canonical "not a command" result.
    pub fn not_a_command(raw_transcript: impl Into<String>) -> Self {
        Self::new(Action::NoOp, Source::Fallback, 0.0, raw_transcript)
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    pub fn with_angle(mut self, angle_deg: f64) -> Self {
        self.angle_deg = Some(angle_deg);
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn is_actionable(&self) -> bool {
        self.action.is_actionable()
    }

    pub fn has_movement_fields(&self) -> bool {
        self.direction.is_some()
            || self.distance_m.is_some()
            || self.angle_deg.is_some()
            || self.speed_mps.is_some()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action)?;
        if let Some(direction) = self.direction {
            write!(f, " {direction}")?;
        }
        if let Some(distance) = self.distance_m {
            write!(f, " {distance:.2}m")?;
        }
        if let Some(angle) = self.angle_deg {
            write!(f, " {angle:.1}deg")?;
        }
        if let Some(speed) = self.speed_mps {
            write!(f, " @{speed:.2}m/s")?;
        }
        write!(f, " (confidence {:.2}, {})", self.confidence, self.source)
    }
}

/// Uppercase with `-` and whitespace folded into `_`.
fn canonical_literal(raw: &str) -> String {
    raw.trim()
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_uppercase()
}
