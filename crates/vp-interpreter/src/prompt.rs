//! Instruction text sent to the remote interpreter.

use std::fmt::Write;

use vp_protocol::CommandSchema;

const PREAMBLE: &str = "You are the command interpreter for a voice-controlled drone. \
Decide whether the speech contains a drone control instruction and, if it does, \
turn it into a single structured command. Ordinary conversation is not a command.";

const GUIDANCE: &str = "Rules:
- One command per utterance. If several are spoken, pick the first safety-relevant one (LAND, HOVER, EXIT) or else the first one.
- Distances are in meters and angles in degrees. Convert other units.
- Leave distance_m, angle_deg, and speed_mps out when the speaker gives no number.
- \"stop\" means HOVER. \"turn around\" is TURN with angle_deg 180.
- Be flexible with casual phrasing (\"go ahead\", \"move up a bit\", \"spin around\").
- Output JSON only: no markdown, no commentary.";

/// Few-shot pairs: one per category (movement, rotation, action, not a command).
const EXAMPLES: &[(&str, &str)] = &[
    (
        "move forward 3 meters",
        r#"{"action": "MOVE", "direction": "FORWARD", "distance_m": 3.0, "confidence": 0.95}"#,
    ),
    (
        "I think we should go up a little",
        r#"{"action": "MOVE", "direction": "UP", "confidence": 0.8}"#,
    ),
    (
        "turn right 45 degrees",
        r#"{"action": "TURN", "direction": "CLOCKWISE", "angle_deg": 45, "confidence": 0.95}"#,
    ),
    (
        "spin around",
        r#"{"action": "TURN", "direction": "CLOCKWISE", "angle_deg": 180, "confidence": 0.85}"#,
    ),
    (
        "land the drone",
        r#"{"action": "LAND", "confidence": 0.97}"#,
    ),
    (
        "stop",
        r#"{"action": "HOVER", "confidence": 0.9}"#,
    ),
    (
        "how's the weather today?",
        r#"{"action": "NONE", "confidence": 0.95, "rationale": "small talk"}"#,
    ),
];

/// Full system instruction: role, schema, rules, examples.
pub fn system_instruction(schema: &CommandSchema) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(PREAMBLE);
    out.push_str("\n\n");
    out.push_str(&schema.render());
    out.push('\n');
    out.push_str(GUIDANCE);
    out.push_str("\n\nExamples:\n");
    for (speech, json) in EXAMPLES {
        let _ = writeln!(out, "- \"{speech}\" -> {json}");
    }
    out
}

/// User turn wrapping the transcript.
pub fn user_message(transcript: &str) -> String {
    format!("Speech: {}", transcript.trim())
}
