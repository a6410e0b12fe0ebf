//! Keyword fallback parser: offline pattern matching for spoken commands.
//!
//! Always available and deterministic. Groups are tried in order and the
//! first match wins, so safety-relevant phrases ("land", "stop") are listed
//! ahead of movement words that may appear in the same sentence.

use regex::Regex;
use serde::{Deserialize, Serialize};
use vp_protocol::{Action, Command, Direction, Source};

use crate::config::FallbackConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::quantity::{self, Quantity};

/// One ordered rule: any of `patterns` (and none of `excludes`) selects `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternGroup {
    pub name: String,
    pub action: Action,
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Regex fragments, matched case-insensitively on word boundaries.
    pub patterns: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub quantity: Quantity,
    /// Value used when the transcript carries no usable number.
    #[serde(default)]
    pub preset: Option<f64>,
}

impl PatternGroup {
    fn new(name: &str, action: Action, patterns: &[&str]) -> Self {
        Self {
            name: name.into(),
            action,
            direction: None,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            excludes: Vec::new(),
            quantity: Quantity::None,
            preset: None,
        }
    }

    fn toward(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    fn measuring(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    fn preset(mut self, value: f64) -> Self {
        self.preset = Some(value);
        self
    }

    fn excluding(mut self, excludes: &[&str]) -> Self {
        self.excludes = excludes.iter().map(|p| p.to_string()).collect();
        self
    }

    fn check(&self) -> ConfigResult<()> {
        let fail = |msg: &str| -> ConfigResult<()> {
            Err(ConfigError::InvalidConfiguration(format!(
                "fallback group '{}': {msg}",
                self.name
            )))
        };

        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "fallback group with empty name".into(),
            ));
        }
        if self.patterns.iter().all(|p| p.trim().is_empty()) {
            return fail("no patterns");
        }
        if !self.action.is_actionable() {
            return fail("action NONE cannot be matched");
        }
        match (self.action, self.direction) {
            (Action::Move, Some(d)) if d.is_linear() => {}
            (Action::Turn, Some(d)) if d.is_rotational() => {}
            (Action::Move | Action::Turn, _) => {
                return fail("MOVE needs a linear direction and TURN a rotational one");
            }
            (_, Some(_)) => return fail("direction given for an action that takes none"),
            (_, None) => {}
        }
        let quantity_fits = match self.quantity {
            Quantity::None => self.preset.is_none(),
            Quantity::Distance => self.action.accepts_distance(),
            Quantity::Angle => self.action.accepts_angle(),
        };
        if !quantity_fits {
            return fail("quantity or preset does not fit the action");
        }
        if let Some(preset) = self.preset
            && !(preset.is_finite() && preset > 0.0)
        {
            return fail("preset must be a positive number");
        }
        Ok(())
    }
}

/// The built-in group list, in priority order.
pub fn default_groups() -> Vec<PatternGroup> {
    use Action::*;
    use Direction::*;

    vec![
        PatternGroup::new(
            "exit",
            Exit,
            &[
                "exit",
                "quit",
                "goodbye",
                "stop listening",
                "end (?:the )?session",
            ],
        ),
        PatternGroup::new(
            "land",
            Land,
            &["land", "landing", "touch ?down", "set (?:it|her) down"],
        ),
        PatternGroup::new(
            "return_home",
            ReturnHome,
            &["return", "home", "come back", "rth", "rtl"],
        ),
        PatternGroup::new("stop", Hover, &["stop", "halt", "freeze", "abort"]),
        PatternGroup::new(
            "takeoff",
            Takeoff,
            &["take ?off", "lift ?off", "launch", "get airborne"],
        )
        .measuring(Quantity::Distance),
        PatternGroup::new(
            "turn_around",
            Turn,
            &["turn around", "spin around", "turn back", "about face", "u-?turn"],
        )
        .toward(Clockwise)
        .measuring(Quantity::Angle)
        .preset(180.0),
        PatternGroup::new(
            "turn_counterclockwise",
            Turn,
            &[
                "counter ?-?clockwise",
                "anti ?-?clockwise",
                "(?:turn|rotate|yaw|spin|pivot)(?: to)?(?: the| your)? left",
            ],
        )
        .toward(Counterclockwise)
        .measuring(Quantity::Angle),
        PatternGroup::new(
            "turn_clockwise",
            Turn,
            &[
                "clockwise",
                "(?:turn|rotate|yaw|spin|pivot)(?: to)?(?: the| your)? right",
                "(?:turn|rotate|yaw|spin)(?: by)? \\d+",
            ],
        )
        .toward(Clockwise)
        .measuring(Quantity::Angle),
        PatternGroup::new(
            "forward",
            Move,
            &["forwards?", "ahead", "advance", "onwards?"],
        )
        .toward(Forward)
        .measuring(Quantity::Distance),
        PatternGroup::new(
            "backward",
            Move,
            &["backwards?", "back", "reverse", "retreat"],
        )
        .toward(Backward)
        .measuring(Quantity::Distance),
        PatternGroup::new("left", Move, &["left"])
            .toward(Left)
            .measuring(Quantity::Distance),
        PatternGroup::new("right", Move, &["right"])
            .toward(Right)
            .measuring(Quantity::Distance)
            .excluding(&["all right", "right now", "right away", "that'?s right"]),
        PatternGroup::new(
            "up",
            Move,
            &["up", "upwards?", "ascend", "climb", "rise", "higher", "raise"],
        )
        .toward(Up)
        .measuring(Quantity::Distance)
        .excluding(&["what'?s up", "what is up"]),
        PatternGroup::new(
            "down",
            Move,
            &["down", "downwards?", "descend", "lower", "drop", "sink"],
        )
        .toward(Down)
        .measuring(Quantity::Distance)
        .excluding(&["slow down", "calm down"]),
        PatternGroup::new(
            "hover",
            Hover,
            &[
                "hover",
                "hold(?: your)? position",
                "hold still",
                "stay(?: put| there)?",
                "wait",
            ],
        ),
    ]
}

struct CompiledGroup {
    group: PatternGroup,
    matcher: Regex,
    exclude: Option<Regex>,
}

impl CompiledGroup {
    fn compile(group: &PatternGroup) -> ConfigResult<Self> {
        group.check()?;
        let matcher = alternation(&group.patterns).map_err(|e| {
            ConfigError::InvalidConfiguration(format!("fallback group '{}': {e}", group.name))
        })?;
        let exclude = if group.excludes.is_empty() {
            None
        } else {
            Some(alternation(&group.excludes).map_err(|e| {
                ConfigError::InvalidConfiguration(format!(
                    "fallback group '{}' excludes: {e}",
                    group.name
                ))
            })?)
        };
        Ok(Self {
            group: group.clone(),
            matcher,
            exclude,
        })
    }

    /// A pattern hit counts unless it overlaps an excluded idiom.
    fn matches(&self, text: &str) -> bool {
        let Some(exclude) = &self.exclude else {
            return self.matcher.is_match(text);
        };
        let excluded: Vec<_> = exclude.find_iter(text).map(|m| m.range()).collect();
        self.matcher.find_iter(text).any(|hit| {
            !excluded
                .iter()
                .any(|ex| hit.start() < ex.end && ex.start < hit.end())
        })
    }
}

/// `\b(?:(?:p1)|(?:p2)|...)\b`, case-insensitive.
fn alternation(patterns: &[String]) -> Result<Regex, regex::Error> {
    let body = patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("(?:{p})"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{body})\b"))
}

/// Deterministic keyword parser built from an ordered group list.
pub struct FallbackParser {
    groups: Vec<CompiledGroup>,
    confidence: f64,
}

impl FallbackParser {
    pub fn new(config: &FallbackConfig) -> ConfigResult<Self> {
        if !(config.confidence > 0.0 && config.confidence <= 1.0) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "fallback confidence must be within (0, 1], got {}",
                config.confidence
            )));
        }
        if config.groups.is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "fallback needs at least one pattern group".into(),
            ));
        }
        let groups = config
            .groups
            .iter()
            .map(CompiledGroup::compile)
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self {
            groups,
            confidence: config.confidence,
        })
    }

    /// Group names in match order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.group.name.as_str()).collect()
    }

    /// Name of the first group matching `transcript`, if any.
    pub fn matched_group(&self, transcript: &str) -> Option<&str> {
        let text = prepare(transcript);
        self.groups
            .iter()
            .find(|g| g.matches(&text))
            .map(|g| g.group.name.as_str())
    }

    /// Map a transcript to a command skeleton. Never fails; no match is NONE.
    pub fn parse(&self, transcript: &str) -> Command {
        let text = prepare(transcript);
        if text.is_empty() {
            return Command::not_a_command(transcript);
        }

        let Some(compiled) = self.groups.iter().find(|g| g.matches(&text)) else {
            tracing::debug!("no fallback pattern matched");
            return Command::not_a_command(transcript);
        };
        let group = &compiled.group;
        tracing::debug!(group = %group.name, "fallback pattern matched");

        let mut cmd = Command::new(group.action, Source::Fallback, self.confidence, transcript);
        cmd.direction = group.direction;
        let value = quantity::pick(group.quantity, &text).or(group.preset);
        match group.quantity {
            Quantity::Distance => cmd.distance_m = value,
            Quantity::Angle => cmd.angle_deg = value,
            Quantity::None => {}
        }
        cmd
    }
}

/// Lowercase with whitespace runs collapsed to single spaces.
fn prepare(transcript: &str) -> String {
    transcript
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
