//! Response validator: raw remote text → pre-normalization `Command`.
//!
//! The payload is decoded into a `serde_json::Value` and checked field by
//! field against the `CommandSchema`, so that type errors, missing fields and
//! structural mismatches map onto distinct error variants.

use std::collections::HashMap;

use serde_json::Value;
use vp_protocol::{Action, Command, CommandSchema, Direction, FieldKind, Source};

use crate::error::InterpretError;

/// Validates remote payloads against a command schema.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    schema: CommandSchema,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseValidator {
    pub fn new() -> Self {
        Self::with_schema(CommandSchema::standard())
    }

    pub fn with_schema(schema: CommandSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CommandSchema {
        &self.schema
    }

    /// Validate `raw` and build a `Source::Remote` command for `transcript`.
    pub fn validate(&self, raw: &str, transcript: &str) -> Result<Command, InterpretError> {
        let body = extract_json(raw);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| InterpretError::MalformedResponse(format!("not valid JSON: {e}")))?;
        let Value::Object(object) = value else {
            return Err(InterpretError::MalformedResponse(
                "expected a JSON object".into(),
            ));
        };

        // Canonical keys; JSON null counts as absent.
        let fields: HashMap<String, &Value> = object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (canonical_key(k), v))
            .collect();

        for field in self.schema.required_fields() {
            if !fields.contains_key(field.name) {
                return Err(InterpretError::MalformedResponse(format!(
                    "missing required field '{}'",
                    field.name
                )));
            }
        }
        for field in self.schema.fields() {
            if let Some(value) = fields.get(field.name) {
                check_type(field.name, field.kind, value)?;
            }
        }

        let text = |name: &str| fields.get(name).and_then(|v| v.as_str());
        let number = |name: &str| fields.get(name).and_then(|v| v.as_f64());

        let confidence = number("confidence").unwrap_or(0.0).clamp(0.0, 1.0);
        let rationale = text("rationale")
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);

        let action = text("action").and_then(Action::parse_literal);
        let direction = match text("direction") {
            Some(raw) => match Direction::parse_literal(raw) {
                Some(d) => Some(d),
                None => {
                    tracing::debug!(direction = raw, "unrecognized direction, treating as NONE");
                    return Ok(declined(transcript, confidence, rationale));
                }
            },
            None => None,
        };
        let action = match action {
            Some(Action::NoOp) => return Ok(declined(transcript, confidence, rationale)),
            Some(action) => action,
            None => {
                tracing::debug!(action = ?text("action"), "unrecognized action, treating as NONE");
                return Ok(declined(transcript, confidence, rationale));
            }
        };

        let direction = match (action, direction) {
            (Action::Move | Action::Turn, None) => {
                return Err(InterpretError::SchemaViolation(format!(
                    "{action} requires a direction"
                )));
            }
            (Action::Turn, Some(d)) => Some(d.as_rotation().ok_or_else(|| {
                InterpretError::SchemaViolation(format!("direction {d} is not valid for TURN"))
            })?),
            (Action::Move, Some(d)) if d.is_rotational() => {
                return Err(InterpretError::SchemaViolation(format!(
                    "direction {d} is not valid for MOVE"
                )));
            }
            (Action::Move, Some(d)) => Some(d),
            (_, Some(d)) => {
                return Err(InterpretError::SchemaViolation(format!(
                    "{action} takes no direction, got {d}"
                )));
            }
            (_, None) => None,
        };

        let distance_m = number("distance_m");
        if distance_m.is_some() && !action.accepts_distance() {
            return Err(InterpretError::SchemaViolation(format!(
                "distance_m is not meaningful for {action}"
            )));
        }
        let angle_deg = number("angle_deg");
        if angle_deg.is_some() && !action.accepts_angle() {
            return Err(InterpretError::SchemaViolation(format!(
                "angle_deg is not meaningful for {action}"
            )));
        }

        let mut cmd = Command::new(action, Source::Remote, confidence, transcript);
        cmd.direction = direction;
        cmd.distance_m = distance_m;
        cmd.angle_deg = angle_deg;
        cmd.speed_mps = number("speed_mps");
        cmd.rationale = rationale;
        Ok(cmd)
    }
}

/// Remote answer that amounts to "not a command".
fn declined(transcript: &str, confidence: f64, rationale: Option<String>) -> Command {
    let mut cmd = Command::new(Action::NoOp, Source::Remote, confidence, transcript);
    cmd.rationale = rationale;
    cmd
}

fn check_type(name: &str, kind: FieldKind, value: &Value) -> Result<(), InterpretError> {
    let ok = match kind {
        FieldKind::Action | FieldKind::Direction | FieldKind::Text => value.is_string(),
        FieldKind::Number => value.is_number(),
    };
    if ok {
        Ok(())
    } else {
        let expected = if kind == FieldKind::Number {
            "a number"
        } else {
            "a string"
        };
        Err(InterpretError::SchemaViolation(format!(
            "'{name}' must be {expected}, got {value}"
        )))
    }
}

/// Lowercase with `-` and spaces folded into `_`.
fn canonical_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Extract JSON from model output that may be wrapped in markdown code fences
/// or surrounded by prose.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    // ```json ... ``` (any case) or plain ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let after_tag = after_fence
            .strip_prefix("json")
            .or_else(|| after_fence.strip_prefix("JSON"))
            .unwrap_or(after_fence);
        if let Some(end) = after_tag.find("```") {
            return after_tag[..end].trim();
        }
        // Unterminated fence: take the rest.
        return after_tag.trim();
    }

    // Prose around a bare object.
    if !trimmed.starts_with('{')
        && let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}'))
        && open < close
    {
        return &trimmed[open..=close];
    }

    trimmed
}
