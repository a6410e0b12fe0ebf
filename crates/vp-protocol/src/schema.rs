//! The structured shape the remote interpreter is asked to emit.

use std::fmt::Write;

use crate::commands::{Action, Direction};

/// JSON type expected for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String literal from the `Action` set.
    Action,
    /// String literal from the `Direction` set.
    Direction,
    Number,
    Text,
}

impl FieldKind {
    pub fn allowed_values(self) -> Vec<&'static str> {
        match self {
            FieldKind::Action => Action::ALL.iter().map(|a| a.as_str()).collect(),
            FieldKind::Direction => Direction::ALL.iter().map(|d| d.as_str()).collect(),
            FieldKind::Number | FieldKind::Text => Vec::new(),
        }
    }
}

/// One field of the response object.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

/// Field list shared by the instruction prompt and the response validator.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSchema {
    fields: Vec<FieldSpec>,
}

impl Default for CommandSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandSchema {
    pub fn standard() -> Self {
        let fields = vec![
            FieldSpec {
                name: "action",
                kind: FieldKind::Action,
                required: true,
                description: "what the drone should do; NONE when the speech is not a drone command",
            },
            FieldSpec {
                name: "direction",
                kind: FieldKind::Direction,
                required: false,
                description: "required for MOVE (FORWARD, BACKWARD, LEFT, RIGHT, UP, DOWN) and TURN (CLOCKWISE, COUNTERCLOCKWISE); omit otherwise",
            },
            FieldSpec {
                name: "distance_m",
                kind: FieldKind::Number,
                required: false,
                description: "meters to travel for MOVE, or target altitude for TAKEOFF; omit if not stated",
            },
            FieldSpec {
                name: "angle_deg",
                kind: FieldKind::Number,
                required: false,
                description: "degrees to rotate for TURN; omit if not stated",
            },
            FieldSpec {
                name: "speed_mps",
                kind: FieldKind::Number,
                required: false,
                description: "meters per second, only when the speaker asks for a speed",
            },
            FieldSpec {
                name: "confidence",
                kind: FieldKind::Number,
                required: true,
                description: "how sure you are of this interpretation, 0.0 to 1.0",
            },
            FieldSpec {
                name: "rationale",
                kind: FieldKind::Text,
                required: false,
                description: "short human-readable explanation",
            },
        ];
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Plain-text description of the schema for the instruction prompt.
    pub fn render(&self) -> String {
        let mut out = String::from("Respond with ONLY a JSON object with these fields:\n");
        for field in &self.fields {
            let presence = if field.required { "required" } else { "optional" };
            let _ = write!(out, "- \"{}\" ({presence}", field.name);
            match field.kind {
                FieldKind::Action | FieldKind::Direction => {
                    let _ = write!(out, ", one of {}", field.kind.allowed_values().join(" | "));
                }
                FieldKind::Number => out.push_str(", number"),
                FieldKind::Text => out.push_str(", string"),
            }
            let _ = writeln!(out, "): {}", field.description);
        }
        out
    }
}
