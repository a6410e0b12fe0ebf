//! Shared test harness for E2E integration tests.
//!
//! Wires the arbiter (with a real `GeminiClient` pointed at a wiremock
//! server), the dispatcher, and a `MockFlightController`, so every test runs
//! the same code paths as the binary minus the simulator.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vp_agent::config::SessionConfig;
use vp_agent::session::{Session, SessionSummary, TurnOutcome};
use vp_agent::transcript::ScriptedTranscripts;
use vp_flight::{Dispatcher, FlightConfig, MockFlightController};
use vp_interpreter::{Arbiter, Interpretation, InterpreterConfig, RemoteConfig};
use vp_protocol::Command;

/// Request path the Gemini client posts to with the default model.
pub const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

/// End-to-end test harness: remote interpreter mock + arbiter + dispatcher.
pub struct TestHarness {
    /// Mock Gemini endpoint (unused in fallback-only harnesses).
    pub server: MockServer,
    pub config: InterpreterConfig,
    pub arbiter: Arbiter,
    pub dispatcher: Dispatcher,
    /// Records every primitive that reached the "vehicle".
    pub flight: Arc<MockFlightController>,
}

impl TestHarness {
    /// Harness with the remote interpreter pointed at a fresh mock server.
    pub async fn with_remote() -> Self {
        let server = MockServer::start().await;
        let config = InterpreterConfig {
            remote: RemoteConfig {
                endpoint: server.uri(),
                api_key: Some("test-key".into()),
                timeout_ms: 500,
                ..RemoteConfig::default()
            },
            ..InterpreterConfig::default()
        };
        Self::build(server, config)
    }

    /// Harness in fallback-only mode; the mock server is never contacted.
    pub async fn fallback_only() -> Self {
        let server = MockServer::start().await;
        let config = InterpreterConfig {
            fallback_only: true,
            ..InterpreterConfig::default()
        };
        Self::build(server, config)
    }

    fn build(server: MockServer, config: InterpreterConfig) -> Self {
        let arbiter = Arbiter::from_config(&config).unwrap();
        let flight = Arc::new(MockFlightController::new());
        let dispatcher = Dispatcher::new(
            flight.clone(),
            config.limits.clone(),
            &FlightConfig::default(),
        );
        Self {
            server,
            config,
            arbiter,
            dispatcher,
            flight,
        }
    }

    /// Make the remote interpreter answer every request with `text`.
    pub async fn remote_replies(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(text)))
            .mount(&self.server)
            .await;
    }

    /// Make the remote interpreter answer once with `text`, in mount order.
    pub async fn remote_replies_once(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(text)))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Make the remote interpreter fail with an HTTP status.
    pub async fn remote_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Make the remote interpreter answer only after `delay`.
    pub async fn remote_delayed(&self, text: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(text))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of requests the mock remote has received.
    pub async fn remote_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    pub async fn interpret(&self, transcript: &str) -> Interpretation {
        self.arbiter.interpret(transcript).await
    }

    /// Interpret and dispatch one transcript the way the session does,
    /// without confirmation handling.
    pub async fn interpret_and_dispatch(&self, transcript: &str) -> Command {
        let interpretation = self.interpret(transcript).await;
        if interpretation.command.is_actionable() {
            let _ = self.dispatcher.dispatch(&interpretation.command).await;
        }
        interpretation.command
    }

    /// Run a full listening session over `transcripts`.
    pub async fn run_session(
        &self,
        transcripts: &[&str],
        config: SessionConfig,
    ) -> (SessionSummary, Vec<TurnOutcome>) {
        let mut source = ScriptedTranscripts::new(transcripts.iter().copied());
        let mut outcomes = Vec::new();
        let summary = Session::new(&self.arbiter, &self.dispatcher, config)
            .run_with(&mut source, |o| outcomes.push(o.clone()))
            .await
            .unwrap();
        (summary, outcomes)
    }
}

/// Wrap `text` in a `generateContent` response envelope.
pub fn envelope(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}
