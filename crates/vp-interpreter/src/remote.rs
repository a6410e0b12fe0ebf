//! Remote interpreter client for the Gemini `generateContent` REST API.
//!
//! Sends the transcript with the command-schema instruction and returns the
//! model's raw text. Interpreting that text is the validator's job; this
//! module only deals with transport and the response envelope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vp_protocol::CommandSchema;

use crate::config::RemoteConfig;
use crate::error::{ConfigError, ConfigResult, InterpretError};
use crate::prompt;

/// A language-understanding service that turns a transcript into raw text.
#[async_trait]
pub trait RemoteInterpreter: Send + Sync {
    /// One bounded call. Never retried by the caller within a transcript.
    async fn interpret(&self, transcript: &str) -> Result<String, InterpretError>;

    /// Name of this interpreter (for logging).
    fn name(&self) -> &str;
}

/// `generateContent` request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// `generateContent` response (only fields we need).
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Client for the hosted Gemini model.
pub struct GeminiClient {
    client: reqwest::Client,
    config: RemoteConfig,
    system_instruction: String,
}

impl GeminiClient {
    pub fn new(config: RemoteConfig) -> ConfigResult<Self> {
        Self::with_schema(config, &CommandSchema::standard())
    }

    pub fn with_schema(config: RemoteConfig, schema: &CommandSchema) -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::InvalidConfiguration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            system_instruction: prompt::system_instruction(schema),
            config,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl RemoteInterpreter for GeminiClient {
    async fn interpret(&self, transcript: &str) -> Result<String, InterpretError> {
        let Some(api_key) = self.config.credential() else {
            return Err(InterpretError::RemoteUnavailable(
                "no API key configured".into(),
            ));
        };

        let user_text = prompt::user_message(transcript);
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &self.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &user_text }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: "application/json",
                thinking_config: ThinkingConfig {
                    thinking_budget: self.config.thinking_budget,
                },
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InterpretError::RemoteUnavailable(format!(
                        "timed out after {}ms",
                        self.config.timeout_ms
                    ))
                } else {
                    InterpretError::RemoteUnavailable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %truncate(&detail, 200), "gemini error body");
            return Err(InterpretError::RemoteUnavailable(format!(
                "gemini returned HTTP {status}"
            )));
        }

        let envelope: GenerateResponse = response.json().await.map_err(|e| {
            InterpretError::RemoteUnavailable(format!("unreadable response envelope: {e}"))
        })?;

        let text: String = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(InterpretError::RemoteUnavailable(
                "response carried no candidate text".into(),
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
