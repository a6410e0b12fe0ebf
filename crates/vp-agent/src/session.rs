//! Listening session: interpret each transcript, then dispatch it.
//!
//! The session owns the only mutable state in the pipeline: a command
//! waiting for confirmation and the count of consecutive remote failures.
//! Dispatch failures are logged and the loop keeps listening. EXIT always
//! ends the session; LAND and RETURN_HOME end it once they reach the vehicle.

use serde::Serialize;
use vp_flight::{DispatchReport, Dispatcher};
use vp_interpreter::{Arbiter, RemoteOutcome};
use vp_protocol::{Action, Command};

use crate::config::{LowConfidencePolicy, SessionConfig};
use crate::transcript::TranscriptSource;

/// Phrases that confirm a held low-confidence command.
const AFFIRMATIONS: &[&str] = &["yes", "confirm", "do it", "affirmative", "go ahead"];

/// Words allowed after an affirmation without turning it into a new command.
const FILLER: &[&str] = &[
    "yes", "yeah", "yep", "ok", "okay", "sure", "please", "now", "confirm", "confirmed",
    "affirmative", "do", "it", "that", "go", "ahead", "thanks",
];

/// Result of handling one transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    Dispatched {
        command: Command,
        report: DispatchReport,
    },
    /// Not a drone command.
    Ignored { transcript: String },
    AwaitingConfirmation { command: Command },
    /// Low-confidence command dropped by policy.
    Discarded { command: Command },
    Failed { command: Command, error: String },
}

/// Counters reported when the session ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub transcripts: usize,
    pub dispatched: usize,
    pub ignored: usize,
    pub discarded: usize,
    pub failed: usize,
    pub remote_failures: usize,
    pub degraded_notices: usize,
    /// Action that ended the session, if any.
    pub ended_by: Option<Action>,
}

pub struct Session<'a> {
    arbiter: &'a Arbiter,
    dispatcher: &'a Dispatcher,
    config: SessionConfig,
    pending: Option<Command>,
    consecutive_failures: u32,
    degraded: bool,
    summary: SessionSummary,
}

impl<'a> Session<'a> {
    pub fn new(arbiter: &'a Arbiter, dispatcher: &'a Dispatcher, config: SessionConfig) -> Self {
        Self {
            arbiter,
            dispatcher,
            config,
            pending: None,
            consecutive_failures: 0,
            degraded: false,
            summary: SessionSummary::default(),
        }
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn pending(&self) -> Option<&Command> {
        self.pending.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.summary.ended_by.is_some()
    }

    /// Drain `source` until it is exhausted or a command ends the session.
    pub async fn run(self, source: &mut dyn TranscriptSource) -> std::io::Result<SessionSummary> {
        self.run_with(source, |_| {}).await
    }

    /// Like [`Session::run`], reporting each outcome to `observer`.
    pub async fn run_with(
        mut self,
        source: &mut dyn TranscriptSource,
        mut observer: impl FnMut(&TurnOutcome),
    ) -> std::io::Result<SessionSummary> {
        tracing::info!(policy = ?self.config.low_confidence_policy, "session started");
        while let Some(transcript) = source.next_transcript().await? {
            let outcome = self.handle(&transcript).await;
            observer(&outcome);
            if self.is_finished() {
                break;
            }
        }
        if let Some(cmd) = self.pending.take() {
            tracing::info!(command = %cmd, "unconfirmed command dropped at end of input");
            self.summary.discarded += 1;
        }
        tracing::info!(
            transcripts = self.summary.transcripts,
            dispatched = self.summary.dispatched,
            ended_by = ?self.summary.ended_by,
            "session finished"
        );
        Ok(self.summary)
    }

    /// Handle one transcript.
    pub async fn handle(&mut self, transcript: &str) -> TurnOutcome {
        self.summary.transcripts += 1;

        if let Some(cmd) = self.pending.take() {
            if is_affirmation(transcript) {
                tracing::info!(command = %cmd, "confirmed");
                return self.dispatch(cmd).await;
            }
            tracing::info!(command = %cmd, "not confirmed, dropping");
            self.summary.discarded += 1;
        }

        let interpretation = self.arbiter.interpret(transcript).await;
        self.track_remote(&interpretation.remote);
        let cmd = interpretation.command;

        if !cmd.is_actionable() {
            tracing::info!(transcript, "not a command, ignoring");
            self.summary.ignored += 1;
            return TurnOutcome::Ignored {
                transcript: transcript.to_string(),
            };
        }

        if cmd.low_confidence {
            match self.config.low_confidence_policy {
                LowConfidencePolicy::Dispatch => {
                    tracing::warn!(
                        command = %cmd,
                        confidence = cmd.confidence,
                        "dispatching low-confidence command"
                    );
                }
                LowConfidencePolicy::Confirm => {
                    tracing::info!(command = %cmd, "awaiting confirmation");
                    self.pending = Some(cmd.clone());
                    return TurnOutcome::AwaitingConfirmation { command: cmd };
                }
                LowConfidencePolicy::Discard => {
                    tracing::warn!(command = %cmd, "discarding low-confidence command");
                    self.summary.discarded += 1;
                    return TurnOutcome::Discarded { command: cmd };
                }
            }
        }

        self.dispatch(cmd).await
    }

    async fn dispatch(&mut self, cmd: Command) -> TurnOutcome {
        match self.dispatcher.dispatch(&cmd).await {
            Ok(report) => {
                self.summary.dispatched += 1;
                if cmd.action.ends_session() {
                    self.summary.ended_by = Some(cmd.action);
                }
                TurnOutcome::Dispatched {
                    command: cmd,
                    report,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, command = %cmd, "dispatch failed");
                self.summary.failed += 1;
                if cmd.action == Action::Exit {
                    self.summary.ended_by = Some(Action::Exit);
                }
                TurnOutcome::Failed {
                    command: cmd,
                    error: e.to_string(),
                }
            }
        }
    }

    fn track_remote(&mut self, remote: &RemoteOutcome) {
        match remote {
            RemoteOutcome::Rejected(_) => {
                self.consecutive_failures += 1;
                self.summary.remote_failures += 1;
                let threshold = self.config.degraded_notice_after;
                if threshold > 0 && !self.degraded && self.consecutive_failures >= threshold {
                    tracing::warn!(
                        consecutive_failures = self.consecutive_failures,
                        "remote interpreter keeps failing, continuing on keyword fallback"
                    );
                    self.degraded = true;
                    self.summary.degraded_notices += 1;
                }
            }
            RemoteOutcome::Accepted | RemoteOutcome::Declined => {
                if self.degraded {
                    tracing::info!("remote interpreter recovered");
                }
                self.consecutive_failures = 0;
                self.degraded = false;
            }
            RemoteOutcome::Disabled | RemoteOutcome::Skipped => {}
        }
    }
}

fn is_affirmation(transcript: &str) -> bool {
    let words: Vec<String> = transcript
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    let text = words.join(" ");
    AFFIRMATIONS.iter().any(|a| match text.strip_prefix(a) {
        Some("") => true,
        Some(rest) if rest.starts_with(' ') => {
            rest.split_whitespace().all(|w| FILLER.contains(&w))
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use vp_flight::{FlightCall, FlightConfig, FlightError, MockFlightController};
    use vp_interpreter::{InterpretError, InterpreterConfig, RemoteInterpreter};
    use vp_protocol::Direction;

    use super::*;
    use crate::transcript::ScriptedTranscripts;

    const LOW_CONFIDENCE_FORWARD: &str =
        r#"{"action": "MOVE", "direction": "FORWARD", "distance_m": 3.0, "confidence": 0.2}"#;
    const HOVER: &str = r#"{"action": "HOVER", "confidence": 0.9}"#;

    /// Remote that replays queued replies, then fails.
    struct ScriptedRemote {
        replies: Mutex<VecDeque<Result<String, InterpretError>>>,
    }

    impl ScriptedRemote {
        fn new(replies: Vec<Result<&str, InterpretError>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl RemoteInterpreter for ScriptedRemote {
        async fn interpret(&self, _transcript: &str) -> Result<String, InterpretError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(InterpretError::RemoteUnavailable("offline".into())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn unavailable() -> Result<&'static str, InterpretError> {
        Err(InterpretError::RemoteUnavailable("offline".into()))
    }

    fn fallback_arbiter() -> Arbiter {
        let config = InterpreterConfig {
            fallback_only: true,
            ..InterpreterConfig::default()
        };
        Arbiter::new(&config, None).unwrap()
    }

    fn remote_arbiter(remote: ScriptedRemote) -> Arbiter {
        Arbiter::new(&InterpreterConfig::default(), Some(Box::new(remote))).unwrap()
    }

    fn dispatcher() -> (Dispatcher, Arc<MockFlightController>) {
        let mock = Arc::new(MockFlightController::new());
        let limits = InterpreterConfig::default().limits;
        let dispatcher = Dispatcher::new(mock.clone(), limits, &FlightConfig::default());
        (dispatcher, mock)
    }

    fn policy(low_confidence_policy: LowConfidencePolicy) -> SessionConfig {
        SessionConfig {
            low_confidence_policy,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn affirmations() {
        assert!(is_affirmation("yes"));
        assert!(is_affirmation("Yes!"));
        assert!(is_affirmation("  go   ahead. "));
        assert!(is_affirmation("do it now"));
        assert!(!is_affirmation("yesterday"));
        assert!(!is_affirmation("no"));
        assert!(!is_affirmation(""));
    }

    #[test]
    fn affirmation_with_another_command_is_not_confirmation() {
        assert!(is_affirmation("yes, do it"));
        assert!(is_affirmation("yes please"));
        assert!(is_affirmation("go ahead, okay"));
        assert!(!is_affirmation("yes, land"));
        assert!(!is_affirmation("go ahead and land"));
        assert!(!is_affirmation("yes move left instead"));
    }

    #[tokio::test]
    async fn fallback_session_runs_until_land() {
        let arbiter = fallback_arbiter();
        let (dispatcher, mock) = dispatcher();
        let mut source =
            ScriptedTranscripts::new(["take off", "move forward", "what a nice view", "land", "move forward"]);

        let summary = Session::new(&arbiter, &dispatcher, SessionConfig::default())
            .run(&mut source)
            .await
            .unwrap();

        assert_eq!(summary.transcripts, 4);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.ended_by, Some(Action::Land));
        assert_eq!(source.remaining(), 1);

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], FlightCall::Takeoff { .. }));
        assert!(matches!(
            calls[1],
            FlightCall::MoveBy {
                direction: Direction::Forward,
                distance_m,
                ..
            } if distance_m == 2.0
        ));
        assert_eq!(calls[2], FlightCall::Land);
    }

    #[tokio::test]
    async fn conversational_speech_never_moves() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![unavailable(), unavailable()]));
        let (dispatcher, mock) = dispatcher();
        let mut session = Session::new(&arbiter, &dispatcher, SessionConfig::default());

        let outcome = session.handle("I had a great lunch").await;
        assert!(matches!(outcome, TurnOutcome::Ignored { .. }));
        let outcome = session.handle("   ").await;
        assert!(matches!(outcome, TurnOutcome::Ignored { .. }));

        assert!(mock.calls().is_empty());
        assert_eq!(session.summary().remote_failures, 1);
    }

    #[tokio::test]
    async fn low_confidence_dispatched_by_default() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![Ok(LOW_CONFIDENCE_FORWARD)]));
        let (dispatcher, mock) = dispatcher();
        let mut session = Session::new(&arbiter, &dispatcher, SessionConfig::default());

        let outcome = session.handle("go forward a bit").await;
        match outcome {
            TurnOutcome::Dispatched { command, .. } => assert!(command.low_confidence),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn low_confidence_discarded() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![Ok(LOW_CONFIDENCE_FORWARD)]));
        let (dispatcher, mock) = dispatcher();
        let mut session = Session::new(&arbiter, &dispatcher, policy(LowConfidencePolicy::Discard));

        let outcome = session.handle("go forward a bit").await;
        assert!(matches!(outcome, TurnOutcome::Discarded { .. }));
        assert!(mock.calls().is_empty());
        assert_eq!(session.summary().discarded, 1);
    }

    #[tokio::test]
    async fn confirmation_dispatches_held_command() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![Ok(LOW_CONFIDENCE_FORWARD)]));
        let (dispatcher, mock) = dispatcher();
        let mut session = Session::new(&arbiter, &dispatcher, policy(LowConfidencePolicy::Confirm));

        let outcome = session.handle("go forward a bit").await;
        assert!(matches!(outcome, TurnOutcome::AwaitingConfirmation { .. }));
        assert!(session.pending().is_some());
        assert!(mock.calls().is_empty());

        let outcome = session.handle("yes").await;
        assert!(matches!(outcome, TurnOutcome::Dispatched { .. }));
        assert!(session.pending().is_none());
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
    async fn unconfirmed_command_is_dropped_and_speech_interpreted() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![Ok(LOW_CONFIDENCE_FORWARD)]));
        let (dispatcher, mock) = dispatcher();
        let mut source = ScriptedTranscripts::new(["go forward a bit", "no wait, land"]);

        let summary = Session::new(&arbiter, &dispatcher, policy(LowConfidencePolicy::Confirm))
            .run(&mut source)
            .await
            .unwrap();

        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.ended_by, Some(Action::Land));
        assert_eq!(mock.calls(), vec![FlightCall::Land]);
    }

    #[tokio::test]
    async fn yes_followed_by_land_lands_instead_of_confirming() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![Ok(LOW_CONFIDENCE_FORWARD)]));
        let (dispatcher, mock) = dispatcher();
        let mut source = ScriptedTranscripts::new(["go forward a bit", "yes, land"]);

        let summary = Session::new(&arbiter, &dispatcher, policy(LowConfidencePolicy::Confirm))
            .run(&mut source)
            .await
            .unwrap();

        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.ended_by, Some(Action::Land));
        assert_eq!(mock.calls(), vec![FlightCall::Land]);
    }

    #[tokio::test]
    async fn pending_command_dropped_at_end_of_input() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![Ok(LOW_CONFIDENCE_FORWARD)]));
        let (dispatcher, mock) = dispatcher();
        let mut source = ScriptedTranscripts::new(["go forward a bit"]);

        let summary = Session::new(&arbiter, &dispatcher, policy(LowConfidencePolicy::Confirm))
            .run(&mut source)
            .await
            .unwrap();

        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.ended_by, None);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn degraded_notice_fires_once_and_rearms() {
        let remote = ScriptedRemote::new(vec![
            unavailable(),
            unavailable(),
            unavailable(),
            unavailable(),
            Ok(HOVER),
            unavailable(),
            unavailable(),
            unavailable(),
        ]);
        let arbiter = remote_arbiter(remote);
        let (dispatcher, mock) = dispatcher();
        let mut source = ScriptedTranscripts::new(vec!["hover"; 8]);

        let summary = Session::new(&arbiter, &dispatcher, SessionConfig::default())
            .run(&mut source)
            .await
            .unwrap();

        assert_eq!(summary.remote_failures, 7);
        assert_eq!(summary.degraded_notices, 2);
        assert_eq!(summary.dispatched, 8);
        assert!(mock.calls().iter().all(|c| *c == FlightCall::Hover));
    }

    #[tokio::test]
    async fn degraded_notice_can_be_disabled() {
        let arbiter = remote_arbiter(ScriptedRemote::new(vec![]));
        let (dispatcher, _mock) = dispatcher();
        let config = SessionConfig {
            degraded_notice_after: 0,
            ..SessionConfig::default()
        };
        let mut source = ScriptedTranscripts::new(vec!["hover"; 5]);

        let summary = Session::new(&arbiter, &dispatcher, config)
            .run(&mut source)
            .await
            .unwrap();
        assert_eq!(summary.remote_failures, 5);
        assert_eq!(summary.degraded_notices, 0);
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_listening() {
        let arbiter = fallback_arbiter();
        let (dispatcher, mock) = dispatcher();
        mock.fail_next(FlightError::Controller("link lost".into()));
        let mut source = ScriptedTranscripts::new(["hover", "return home", "land"]);

        let mut outcomes = Vec::new();
        let summary = Session::new(&arbiter, &dispatcher, SessionConfig::default())
            .run_with(&mut source, |o| outcomes.push(o.clone()))
            .await
            .unwrap();

        assert!(matches!(outcomes[0], TurnOutcome::Failed { .. }));
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.ended_by, Some(Action::ReturnHome));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(mock.calls(), vec![FlightCall::Hover, FlightCall::ReturnHome]);
    }

    #[tokio::test]
    async fn exit_ends_session_even_if_stop_fails() {
        let arbiter = fallback_arbiter();
        let (dispatcher, mock) = dispatcher();
        mock.fail_next(FlightError::Controller("already stopped".into()));
        let mut source = ScriptedTranscripts::new(["goodbye", "hover"]);

        let summary = Session::new(&arbiter, &dispatcher, SessionConfig::default())
            .run(&mut source)
            .await
            .unwrap();

        assert_eq!(summary.ended_by, Some(Action::Exit));
        assert_eq!(summary.failed, 1);
        assert_eq!(mock.calls(), vec![FlightCall::Stop]);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let outcome = TurnOutcome::Ignored {
            transcript: "nice weather".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "ignored");
        assert_eq!(json["transcript"], "nice weather");
    }
}
